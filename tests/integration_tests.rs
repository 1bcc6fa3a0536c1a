use std::collections::BTreeSet;

use anyhow::Result;
use chrono::NaiveDate;
use sales_ledger_analytics::*;

const HEADER: &str =
    "FechaVta;DescMaterial;NombreComercial;Unidades;VtaFacturada;Georeferenciado";

fn ledger(rows: &[&str]) -> String {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text
}

fn names(items: &[&str]) -> Option<BTreeSet<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

#[test]
fn test_three_record_acceptance_scenario() -> Result<()> {
    let text = ledger(&[
        "15/01/2024;productA;clientX;10;100.00;-17.78,-63.18",
        "20/01/2024;productB;clientY;5;50.00;",
        "10/02/2024;productA;clientX;2;20.00;invalid",
    ]);
    let dataset = Dataset::from_reader(text.as_bytes())?;
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.warning_count(), 0);

    let filtered = dataset.filter(&FilterCriteria::default());

    let kpis = filtered.kpis();
    assert!((kpis.total_revenue - 170.0).abs() < 1e-9);
    assert_eq!(kpis.total_units, 17);
    assert_eq!(kpis.record_count, 3);
    assert!((kpis.average_ticket - 56.67).abs() < 0.01);

    let series = filtered.time_series();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].period, YearMonth::new(2024, 1).unwrap());
    assert!((series[0].revenue - 150.0).abs() < 1e-9);
    assert_eq!(series[0].units, 15);
    assert_eq!(series[1].period, YearMonth::new(2024, 2).unwrap());
    assert!((series[1].revenue - 20.0).abs() < 1e-9);
    assert_eq!(series[1].units, 2);

    let top = filtered.top_n(TopDimension::Product, 1);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].key, "productA");
    assert!((top[0].revenue - 120.0).abs() < 1e-9);
    assert_eq!(top[0].rank, 1);

    let located = dataset
        .records()
        .iter()
        .filter(|r| r.geo.is_some())
        .count();
    assert_eq!(located, 1);

    Ok(())
}

#[test]
fn test_filtering_matches_dashboard_expectations() -> Result<()> {
    let text = ledger(&[
        "05/01/2024;Paracetamol;Farmacia Central;10;120,50;-17.78,-63.18",
        "18/01/2024;Ibuprofeno;Farmacia Sur;4;80,00;",
        "02/02/2024;Paracetamol;Farmacia Sur;6;90,00;-17.80,-63.20",
        "15/02/2024;Amoxicilina;Farmacia Central;3;150,00;",
        "28/03/2024;Paracetamol;Farmacia Norte;8;95,00;",
    ]);
    let dataset = Dataset::from_reader(text.as_bytes())?;

    let criteria = FilterCriteria {
        date_from: NaiveDate::from_ymd_opt(2024, 1, 10),
        date_to: NaiveDate::from_ymd_opt(2024, 2, 28),
        products: names(&["Paracetamol", "Ibuprofeno"]),
        ..Default::default()
    };
    let filtered = dataset.filter(&criteria);
    assert_eq!(filtered.len(), 2);

    // Filter twice with the same criteria and compare.
    let refined = filtered.refine(&criteria);
    assert_eq!(filtered.records(), refined.records());

    let client_criteria = FilterCriteria {
        clients: names(&["Farmacia Sur"]),
        ..Default::default()
    };
    let sur = dataset.filter(&client_criteria);
    assert_eq!(sur.len(), 2);
    let kpis = sur.kpis();
    assert!((kpis.total_revenue - 170.0).abs() < 1e-9);
    assert!((kpis.average_ticket - 85.0).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_time_series_total_equals_kpi_total() -> Result<()> {
    let text = ledger(&[
        "05/01/2024;A;X;1;33,40;",
        "28/02/2024;B;Y;2;120,00;",
        "03/03/2024;C;Z;3;5,25;",
        "30/03/2024;A;Y;4;66,10;",
        "01/06/2024;B;X;5;900,00;",
    ]);
    let dataset = Dataset::from_reader(text.as_bytes())?;
    let filtered = dataset.filter(&FilterCriteria::default());

    let series = filtered.time_series();
    let kpis = filtered.kpis();
    let series_total: f64 = series.iter().map(|p| p.revenue).sum();
    assert!((series_total - kpis.total_revenue).abs() < 1e-9);

    // Sparse: April and May are absent, not zero rows.
    let periods: Vec<String> = series.iter().map(|p| p.period.to_string()).collect();
    assert_eq!(periods, vec!["2024-01", "2024-02", "2024-03", "2024-06"]);

    Ok(())
}

#[test]
fn test_top_n_deterministic_order_with_ties() -> Result<()> {
    let text = ledger(&[
        "05/01/2024;Zeta;X;1;50,00;",
        "06/01/2024;Alfa;X;1;50,00;",
        "07/01/2024;Beta;X;1;75,00;",
        "08/01/2024;Beta;X;1;25,00;",
    ]);
    let dataset = Dataset::from_reader(text.as_bytes())?;
    let filtered = dataset.filter(&FilterCriteria::default());

    let top = filtered.top_n(TopDimension::Product, TOP_N_DEFAULT);
    let keys: Vec<&str> = top.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["Beta", "Alfa", "Zeta"]);
    assert_eq!(top[0].rank, 1);
    assert_eq!(top[2].rank, 3);

    Ok(())
}

#[test]
fn test_ingestion_warnings_do_not_abort_load() -> Result<()> {
    let text = ledger(&[
        "05/01/2024;A;X;1;10,00;",
        "not-a-date;B;Y;1;10,00;",
        "06/01/2024;C;Z;muchos;10,00;",
        "07/01/2024;D;W;1;-5,00;",
        "07/01/2024;E;V;1",
        "08/01/2024;F;U;2;20,00;",
    ]);
    let dataset = Dataset::from_reader(text.as_bytes())?;
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.warning_count(), 4);

    // Each warning names its line and reason for user display.
    for warning in dataset.warnings() {
        assert!(!warning.to_string().is_empty());
        assert!(warning.line >= 3);
    }

    Ok(())
}

#[test]
fn test_header_without_required_columns_is_fatal() {
    let text = "Fecha;Producto;Cliente\n01/01/2024;A;X\n";
    let err = Dataset::from_reader(text.as_bytes()).unwrap_err();
    assert!(matches!(err, LedgerError::MissingColumns(_)));

    let empty = Dataset::from_reader("".as_bytes()).unwrap_err();
    assert!(matches!(empty, LedgerError::EmptyInput));
}

#[test]
fn test_export_round_trips_filtered_set() -> Result<()> {
    let text = ledger(&[
        "05/01/2024;Jarabe; infantil;X;2;30,00;POINT (-63.18 -17.78)",
        "06/01/2024;Amoxicilina;Farmacia Sur;3;45,50;-17.78,-63.18",
        "07/02/2024;Amoxicilina;Farmacia Norte;1;15,00;sin datos",
    ]);
    // The first row's extra ';' makes it a field-count skip, proving damaged
    // rows stay out of the export path too.
    let dataset = Dataset::from_reader(text.as_bytes())?;
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.warning_count(), 1);

    let criteria = FilterCriteria {
        products: names(&["Amoxicilina"]),
        ..Default::default()
    };
    let filtered = dataset.filter(&criteria);
    let exported = filtered.export()?;

    let reparsed = Dataset::from_reader(exported.as_bytes())?;
    assert_eq!(reparsed.warning_count(), 0);
    assert_eq!(reparsed.records(), filtered.records().iter().map(|r| (*r).clone()).collect::<Vec<_>>());

    // The composite geo text survives verbatim.
    assert_eq!(reparsed.records()[0].geo_raw, "-17.78,-63.18");
    assert_eq!(reparsed.records()[1].geo_raw, "sin datos");

    Ok(())
}

#[test]
fn test_optional_columns_margin_and_clusters() -> Result<()> {
    let text = "\
FechaVta;DescMaterial;DescGrArticulo;NombreComercial;Ciudad;ZonaVenta;Unidades;VtaFacturada;Costo;Georeferenciado
05/01/2024;Paracetamol;Analgésicos;Farmacia Central;Santa Cruz;Centro;10;100,00;60,00;-17.7831,-63.1820
06/01/2024;Ibuprofeno;Analgésicos;Farmacia Sur;Santa Cruz;Centro;4;80,00;50,00;-17.7834,-63.1823
07/01/2024;Amoxicilina;Antibióticos;Farmacia Norte;La Paz;Sopocachi;2;40,00;;-16.5000,-68.1500
";
    let dataset = Dataset::from_reader(text.as_bytes())?;
    let filtered = dataset.filter(&FilterCriteria::default());

    let margin = filtered.margin();
    assert_eq!(margin.records_with_cost, 2);
    assert!((margin.total_margin - 70.0).abs() < 1e-9);
    assert!((margin.margin_pct - 70.0 / 180.0).abs() < 1e-9);

    let clusters = filtered.geo_clusters(3)?;
    assert_eq!(clusters.len(), 2);
    assert!((clusters[0].revenue - 180.0).abs() < 1e-9);
    assert_eq!(clusters[0].count, 2);

    let top_categories = filtered.top_n(TopDimension::Category, TOP_N_DEFAULT);
    assert_eq!(top_categories[0].key, "Analgésicos");
    assert!((top_categories[0].revenue - 180.0).abs() < 1e-9);

    let by_city = dataset.filter(&FilterCriteria {
        cities: names(&["La Paz"]),
        ..Default::default()
    });
    assert_eq!(by_city.len(), 1);
    assert_eq!(by_city.records()[0].product, "Amoxicilina");

    // Optional columns come back out in their original position.
    let exported = dataset.filter(&FilterCriteria::default()).export()?;
    let reparsed = Dataset::from_reader(exported.as_bytes())?;
    assert_eq!(reparsed.columns(), dataset.columns());
    assert_eq!(reparsed.records(), dataset.records());

    Ok(())
}

#[test]
fn test_geo_extraction_conventions_round_trip() {
    for (text, lat, lon) in [
        ("-17.78,-63.18", -17.78, -63.18),
        ("-17.78 -63.18", -17.78, -63.18),
        ("POINT (-63.18 -17.78)", -17.78, -63.18),
        ("Farmacia (-17.7833, -63.1821)", -17.7833, -63.1821),
    ] {
        let point = geo::extract(text).unwrap_or_else(|| panic!("no point in '{text}'"));
        assert!((point.latitude - lat).abs() < 1e-9, "latitude in '{text}'");
        assert!((point.longitude - lon).abs() < 1e-9, "longitude in '{text}'");
    }

    for text in ["", "sin coordenadas", "99.0,10.0", "10.0,-190.0"] {
        assert_eq!(geo::extract(text), None, "expected miss for '{text}'");
    }
}

#[test]
fn test_empty_filtered_set_is_well_defined() -> Result<()> {
    let text = ledger(&["05/01/2024;A;X;1;10,00;"]);
    let dataset = Dataset::from_reader(text.as_bytes())?;

    let none = dataset.filter(&FilterCriteria {
        products: names(&["Inexistente"]),
        ..Default::default()
    });
    assert!(none.is_empty());

    let kpis = none.kpis();
    assert_eq!(kpis.total_revenue, 0.0);
    assert_eq!(kpis.average_ticket, 0.0);
    assert!(none.time_series().is_empty());
    assert!(none.top_n(TopDimension::Product, TOP_N_DEFAULT).is_empty());
    assert!(none.geo_clusters(3)?.is_empty());

    let exported = none.export()?;
    assert_eq!(exported.lines().count(), 1);

    Ok(())
}

// ==========================================
// 能源统计数据源集成测试
// ==========================================
// 职责: 验证 工作簿 → 换算表 → 版式推断 → 数据行组装 全流程
// 场景: 合成工作簿（见 test_helpers::energy_workbook）
// ==========================================


use shifter_stats::api::EnergyDatasource;
use shifter_stats::domain::table::DataTable;
use shifter_stats::domain::types::{FieldValue, UnitMode};
use shifter_stats::domain::unit::CanonicalUnit;
use shifter_stats::engine::{DatasourceFilters, DatasourceQuery};
use shifter_stats::importer::error::ImportError;
use shifter_stats::importer::workbook::MemoryWorkbook;
use shifter_stats::linked_data::EnrichmentOptions;
use std::collections::BTreeSet;
use test_helpers::{energy_workbook, MockResolver, ENERGY_REGIONS};

// ==========================================
// 测试辅助函数
// ==========================================

fn datasource() -> EnergyDatasource<MemoryWorkbook> {
    EnergyDatasource::from_workbook(energy_workbook()).unwrap()
}

fn query(filters: DatasourceFilters, units: UnitMode) -> DatasourceQuery {
    DatasourceQuery {
        filters,
        units,
        enrichment: EnrichmentOptions::default(),
    }
}

fn texts(table: &DataTable, column: &str) -> Vec<String> {
    table
        .column(column)
        .unwrap()
        .into_iter()
        .map(|v| v.to_string())
        .collect()
}

fn numbers(table: &DataTable, column: &str) -> Vec<f64> {
    table
        .column(column)
        .unwrap()
        .into_iter()
        .map(|v| v.as_number().unwrap())
        .collect()
}

// ==========================================
// 元数据
// ==========================================

#[test]
fn test_metadata_supported_sheets() {
    let source = datasource();
    let metadata = source.metadata().unwrap();

    let supported: Vec<(&str, bool)> = metadata
        .iter()
        .map(|m| (m.sheet_type.as_str(), m.supported()))
        .collect();
    assert_eq!(
        supported,
        vec![
            ("Contents", false),
            ("Primary Energy Consumption", true),
            ("Oil Consumption - Barrels", true),
            ("Cobalt and Lithium - Prices", true),
            ("Geothermal Capacity", true),
            ("Approximate conversion factors", false),
        ]
    );

    let primary = metadata[1].layout.as_ref().unwrap();
    assert_eq!(primary.unit.iso, CanonicalUnit::new("J", "", 1e18));
    assert_eq!(primary.years.len(), 57);
    assert_eq!(primary.years.first().unwrap().label, 1965);
    assert_eq!(primary.years.last().unwrap().label, 2021);
    let regions: Vec<&str> = primary.regions.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(regions, ENERGY_REGIONS);

    let oil = metadata[2].layout.as_ref().unwrap();
    assert_eq!(oil.label, "Oil Consumption");
    assert_eq!(oil.unit.normalized, "thousand barrels per day");
    assert_eq!(oil.unit.iso.base_unit, "m³");
    assert_eq!(oil.unit.iso.postfix, " per day");
    assert!((oil.unit.iso.scale_factor - 6289.8).abs() < 1e-9);

    let prices = metadata[3].layout.as_ref().unwrap();
    assert_eq!(prices.header_row, 4);
    assert_eq!(prices.label, "Cobalt and Lithium");
}

#[test]
fn test_metadata_is_recomputed_identically() {
    let source = datasource();
    assert_eq!(source.metadata().unwrap(), source.metadata().unwrap());
}

#[test]
fn test_missing_conversion_sheet() {
    let mut wb = MemoryWorkbook::new();
    wb.add_sheet("Contents");
    let result = EnergyDatasource::from_workbook(wb);
    assert!(matches!(result, Err(ImportError::SheetNotFound(_))));
}

#[test]
fn test_gallons_synonym_from_conversion_table() {
    let source = datasource();
    let gallons = source.parser().parse("Million US gallons").unwrap();
    assert_eq!(gallons.base_unit, "m³");
    assert!((gallons.scale_factor - 1e6 * 0.0238 * 6.2898).abs() < 1e-6);
}

// ==========================================
// 数据行组装
// ==========================================

#[test]
fn test_years_factor_on_primary_energy() {
    let source = datasource();
    let filters = DatasourceFilters {
        types: Some(vec!["Primary Energy Consumption".to_string()]),
        years_factor: Some(20),
        ..Default::default()
    };
    let table = source.datasource(&query(filters, UnitMode::Iso), None).unwrap();

    let years: BTreeSet<String> = texts(&table, "Year").into_iter().collect();
    assert_eq!(
        years,
        ["1980", "2000", "2020"].iter().map(|y| y.to_string()).collect()
    );
    assert_eq!(table.len(), 3 * ENERGY_REGIONS.len());
    assert!(texts(&table, "Unit").iter().all(|u| u == "J"));
    assert!(texts(&table, "TypeUnit")
        .iter()
        .all(|u| u == "Primary Energy Consumption [J]"));
}

#[test]
fn test_iso_values_are_original_values_scaled() {
    let source = datasource();
    let metadata = source.metadata().unwrap();
    let original = source
        .datasource(&query(DatasourceFilters::default(), UnitMode::Original), None)
        .unwrap();
    let iso = source
        .datasource(&query(DatasourceFilters::default(), UnitMode::Iso), None)
        .unwrap();
    assert_eq!(original.len(), iso.len());

    let types = texts(&iso, "Type");
    for ((o, i), sheet_type) in numbers(&original, "Value")
        .into_iter()
        .zip(numbers(&iso, "Value"))
        .zip(types)
    {
        let factor = metadata
            .iter()
            .find(|m| m.sheet_type == sheet_type)
            .and_then(|m| m.layout.as_ref())
            .map(|l| l.unit.iso.scale_factor)
            .unwrap();
        assert_eq!(i, o * factor);
    }
}

#[test]
fn test_postfix_only_in_iso_mode() {
    let source = datasource();
    let filters = DatasourceFilters {
        types: Some(vec!["Oil Consumption - Barrels".to_string()]),
        years: Some(vec![2020]),
        regions: Some(vec!["Switzerland".to_string()]),
        ..Default::default()
    };

    let iso = source.datasource(&query(filters.clone(), UnitMode::Iso), None).unwrap();
    assert_eq!(texts(&iso, "Unit"), vec!["m³ per day"]);
    assert_eq!(texts(&iso, "TypeUnit"), vec!["Oil Consumption [m³] per day"]);
    assert!((numbers(&iso, "Value")[0] - 221.0 * 6289.8).abs() < 1e-6);

    let normalized = source
        .datasource(&query(filters.clone(), UnitMode::Normalized), None)
        .unwrap();
    assert_eq!(texts(&normalized, "Unit"), vec!["thousand barrels per day"]);
    assert_eq!(numbers(&normalized, "Value"), vec![221.0]);

    let original = source.datasource(&query(filters, UnitMode::Original), None).unwrap();
    assert_eq!(texts(&original, "Unit"), vec!["Thousand barrels daily"]);
    assert_eq!(
        texts(&original, "TypeUnit"),
        vec!["Oil Consumption [Thousand barrels daily]"]
    );
}

#[test]
fn test_unit_filter_matches_emitted_unit() {
    let source = datasource();
    let filters = DatasourceFilters {
        units: Some(vec!["W".to_string()]),
        ..Default::default()
    };
    let iso = source.datasource(&query(filters.clone(), UnitMode::Iso), None).unwrap();
    assert_eq!(texts(&iso, "Type"), vec!["Geothermal Capacity", "Geothermal Capacity"]);
    assert_eq!(numbers(&iso, "Value"), vec![1e9, 1.01e9]);

    // 原始模式下单位文本为 "Megawatts"，不匹配
    let original = source.datasource(&query(filters, UnitMode::Original), None).unwrap();
    assert!(original.is_empty());
}

#[test]
fn test_non_numeric_cells_are_skipped() {
    let source = datasource();
    let filters = DatasourceFilters {
        types: Some(vec!["Primary Energy Consumption".to_string()]),
        years: Some(vec![1965, 1966]),
        regions: Some(vec!["Switzerland".to_string()]),
        ..Default::default()
    };
    let table = source.datasource(&query(filters, UnitMode::Original), None).unwrap();
    assert_eq!(texts(&table, "Year"), vec!["1966"]);
    assert_eq!(numbers(&table, "Value"), vec![10.25]);
}

#[test]
fn test_invalid_years_factor() {
    let source = datasource();
    let filters = DatasourceFilters {
        years_factor: Some(0),
        ..Default::default()
    };
    let result = source.datasource(&query(filters, UnitMode::Iso), None);
    assert!(matches!(result, Err(ImportError::InvalidFilter(_))));
}

// ==========================================
// 知识库补充列
// ==========================================

#[test]
fn test_enrichment_columns_and_nulls() {
    let source = datasource();
    let query = DatasourceQuery {
        filters: DatasourceFilters {
            types: Some(vec!["Primary Energy Consumption".to_string()]),
            years: Some(vec![2000]),
            ..Default::default()
        },
        units: UnitMode::Iso,
        enrichment: EnrichmentOptions {
            with_id: true,
            with_name: true,
            with_type: true,
            properties: vec!["P297".to_string()],
        },
    };
    let mut resolver = MockResolver::default();
    let table = source.datasource(&query, Some(&mut resolver)).unwrap();

    assert_eq!(
        table.columns,
        vec![
            "Value",
            "Type",
            "Unit",
            "TypeUnit",
            "Year",
            "Region",
            "WikidataId",
            "WikidataName",
            "WikidataType",
            "WikidataIso3166_1Alpha_2Code",
        ]
    );
    assert_eq!(table.len(), 3);

    // "Total World" 去掉前缀后解析
    let names: Vec<Option<String>> = resolver.resolve_calls.iter().map(|(n, _)| n.clone()).collect();
    assert_eq!(
        names,
        vec![
            Some("Switzerland".to_string()),
            Some("World".to_string()),
            Some("Other Europe".to_string()),
        ]
    );

    let swiss = &table.rows[0];
    assert_eq!(swiss[6], FieldValue::Text("Q39".to_string()));
    assert_eq!(swiss[8], FieldValue::Text("country".to_string()));
    assert_eq!(swiss[9], FieldValue::Text("CH".to_string()));

    let world = &table.rows[1];
    assert_eq!(world[5], FieldValue::Text("Total World".to_string()));
    assert_eq!(world[6], FieldValue::Text("Q16502".to_string()));
    assert_eq!(world[7], FieldValue::Text("world".to_string()));
    assert_eq!(world[9], FieldValue::Null);

    let other = &table.rows[2];
    assert!(other[6..].iter().all(FieldValue::is_null));
}

#[test]
fn test_enrichment_without_resolver() {
    let source = datasource();
    let query = DatasourceQuery {
        enrichment: EnrichmentOptions {
            with_type: true,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(
        source.datasource(&query, None),
        Err(ImportError::ResolverMissing)
    ));
}

// ==========================================
// 换算表
// ==========================================

#[test]
fn test_conversion_tables_loaded_at_construction() {
    let source = datasource();
    let tables = source.conversion_tables();
    assert_eq!(tables.oil.factor("us gallons", "barrels"), Some(0.0238));
    assert_eq!(tables.oil_products.len(), 7);
    let lpg = tables.oil_products["LPG"].factor("barrels", "tonnes").unwrap();
    assert!((lpg - 7.1).abs() < 1e-12);
    assert_eq!(
        tables.gas.factor("billion cubic metres ng", "billion cubic feet ng"),
        Some(35.3)
    );
}

#[test]
fn test_non_fossil_electricity_factors() {
    let source = datasource();
    let table = source.non_fossil_electricity_factors(1998).unwrap();
    assert_eq!(table.columns, vec!["Year", "Factor"]);
    assert_eq!(table.len(), 3 + 9 + 10);
    assert_eq!(table.rows[0], vec![FieldValue::Integer(1998), FieldValue::Number(0.38)]);
    assert_eq!(table.rows[3], vec![FieldValue::Integer(2001), FieldValue::Number(0.4)]);
    assert_eq!(table.rows[12], vec![FieldValue::Integer(2010), FieldValue::Number(0.5)]);
    assert_eq!(table.rows[21][0], FieldValue::Integer(2019));
}

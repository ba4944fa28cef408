use crate::config::InputPaths;
use crate::domain::model::{
    ComponentId, LevelMatrix, PlateLayout, PlateLayouts, PlateSlot, SourcePlate, StandardRecipe,
    StockEntry, StockTable, TargetMatrix, TargetRow, VolumeMatrix, WellId,
};
use crate::domain::ports::Storage;
use crate::utils::error::{PrepError, Result};

const STOCK_TABLE: &str = "stock_concentrations";
const RECIPE_TABLE: &str = "standard_recipe_concentrations";
const TARGET_TABLE: &str = "target_concentrations";

fn header_index(headers: &csv::StringRecord, name: &str, table: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| PrepError::MalformedTableError {
            table: table.to_string(),
            reason: format!("missing column '{}'", name),
        })
}

fn parse_float(raw: &str, table: &str, context: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| PrepError::MalformedTableError {
            table: table.to_string(),
            reason: format!("{}: '{}' is not a number", context, raw),
        })
}

/// A blank or non-positive concentration cell means "no stock at that level".
fn parse_stock_value(raw: &str, table: &str, context: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = parse_float(trimmed, table, context)?;
    Ok((value > 0.0).then_some(value))
}

pub fn parse_stock_table(data: &[u8]) -> Result<StockTable> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader.headers()?.clone();
    let component_idx = header_index(&headers, "Component", STOCK_TABLE)?;
    let high_idx = header_index(&headers, "High Concentration", STOCK_TABLE)?;
    let low_idx = header_index(&headers, "Low Concentration", STOCK_TABLE)?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let id = record.get(component_idx).unwrap_or("").trim();
        if id.is_empty() {
            continue;
        }
        entries.push(StockEntry {
            id: ComponentId::new(id),
            high: parse_stock_value(
                record.get(high_idx).unwrap_or(""),
                STOCK_TABLE,
                &format!("high concentration of '{}'", id),
            )?,
            low: parse_stock_value(
                record.get(low_idx).unwrap_or(""),
                STOCK_TABLE,
                &format!("low concentration of '{}'", id),
            )?,
        });
    }
    StockTable::new(entries)
}

pub fn parse_standard_recipe(data: &[u8]) -> Result<StandardRecipe> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader.headers()?.clone();
    let component_idx = header_index(&headers, "Component", RECIPE_TABLE)?;
    // The concentration column carries its unit in the header
    // ("Concentration[mM]"); match on the prefix.
    let conc_idx = headers
        .iter()
        .position(|h| h.trim().starts_with("Concentration"))
        .ok_or_else(|| PrepError::MalformedTableError {
            table: RECIPE_TABLE.to_string(),
            reason: "missing 'Concentration' column".to_string(),
        })?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let id = record.get(component_idx).unwrap_or("").trim();
        if id.is_empty() {
            continue;
        }
        let concentration = parse_float(
            record.get(conc_idx).unwrap_or(""),
            RECIPE_TABLE,
            &format!("concentration of '{}'", id),
        )?;
        entries.push((ComponentId::new(id), concentration));
    }
    Ok(StandardRecipe::new(entries))
}

/// First column: destination well id. Remaining columns: one component each.
pub fn parse_target_matrix(data: &[u8]) -> Result<TargetMatrix> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(PrepError::MalformedTableError {
            table: TARGET_TABLE.to_string(),
            reason: "expected a well column followed by component columns".to_string(),
        });
    }
    let components: Vec<ComponentId> = headers
        .iter()
        .skip(1)
        .map(|h| ComponentId::new(h.trim()))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let well = record.get(0).unwrap_or("").trim();
        if well.is_empty() {
            continue;
        }
        let mut targets = Vec::with_capacity(components.len());
        for (idx, component) in components.iter().enumerate() {
            targets.push(parse_float(
                record.get(idx + 1).unwrap_or(""),
                TARGET_TABLE,
                &format!("target for '{}' in well {}", component, well),
            )?);
        }
        rows.push(TargetRow {
            well: WellId::new(well),
            targets,
        });
    }
    TargetMatrix::new(components, rows)
}

pub fn parse_plate_layout(data: &[u8], plate: SourcePlate, table: &str) -> Result<PlateLayout> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader.headers()?.clone();
    let well_idx = header_index(&headers, "Well", table)?;
    let component_idx = header_index(&headers, "Component", table)?;

    let mut slots = Vec::new();
    for record in reader.records() {
        let record = record?;
        let well = record.get(well_idx).unwrap_or("").trim();
        let label = record.get(component_idx).unwrap_or("").trim();
        if well.is_empty() || label.is_empty() {
            continue;
        }
        slots.push(PlateSlot {
            well: WellId::new(well),
            label: label.to_string(),
        });
    }
    Ok(PlateLayout::new(plate, slots))
}

/// Load and parse all six input tables through the storage port.
pub async fn load_inputs<S: Storage>(
    storage: &S,
    paths: &InputPaths,
) -> Result<(StockTable, StandardRecipe, TargetMatrix, PlateLayouts)> {
    let read = |path: &str, name: &str| {
        let path = path.to_string();
        let name = name.to_string();
        async move {
            storage.read_file(&path).await.map_err(|e| {
                tracing::error!("Failed to read {} from '{}': {}", name, path, e);
                PrepError::MissingTableError { name }
            })
        }
    };

    let stock = parse_stock_table(&read(&paths.stock, STOCK_TABLE).await?)?;
    let recipe = parse_standard_recipe(&read(&paths.standard_recipe, RECIPE_TABLE).await?)?;
    let targets = parse_target_matrix(&read(&paths.targets, TARGET_TABLE).await?)?;
    let high = parse_plate_layout(
        &read(&paths.plate_high, "stock_plate_high").await?,
        SourcePlate::StockHigh,
        "stock_plate_high",
    )?;
    let low = parse_plate_layout(
        &read(&paths.plate_low, "stock_plate_low").await?,
        SourcePlate::StockLow,
        "stock_plate_low",
    )?;
    let fresh = parse_plate_layout(
        &read(&paths.plate_fresh, "stock_plate_fresh").await?,
        SourcePlate::StockFresh,
        "stock_plate_fresh",
    )?;

    Ok((stock, recipe, targets, PlateLayouts { high, low, fresh }))
}

/// Render the volume matrix in the same shape the input tables use: one row
/// per destination well, components in column order, then Water and Culture.
pub fn volume_matrix_csv(volumes: &VolumeMatrix) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut headers = vec!["Well".to_string()];
    headers.extend(volumes.components.iter().map(|c| c.as_str().to_string()));
    headers.push("Water".to_string());
    headers.push("Culture".to_string());
    writer.write_record(&headers)?;

    for row in &volumes.rows {
        let mut record = vec![row.well.as_str().to_string()];
        record.extend(row.by_component.iter().map(|v| format!("{:.3}", v)));
        record.push(format!("{:.3}", row.water));
        record.push(format!("{:.3}", row.culture));
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| PrepError::IoError(std::io::Error::other(e.to_string())))
}

pub fn level_matrix_csv(levels: &LevelMatrix) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut headers = vec!["Well".to_string()];
    headers.extend(levels.components.iter().map(|c| c.as_str().to_string()));
    writer.write_record(&headers)?;

    for row in &levels.rows {
        let mut record = vec![row.well.as_str().to_string()];
        record.extend(
            row.levels
                .iter()
                .map(|level| level.map(|l| l.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| PrepError::IoError(std::io::Error::other(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stock_table() {
        let csv = b"Component,High Concentration,Low Concentration\n\
                    Glc,100,10\n\
                    Kan,300,0\n\
                    Trace,,5\n";
        let table = parse_stock_table(csv).unwrap();

        assert_eq!(table.len(), 3);
        let kan = table.get(&ComponentId::new("Kan")).unwrap();
        assert_eq!(kan.high, Some(300.0));
        assert_eq!(kan.low, None);
        let trace = table.get(&ComponentId::new("Trace")).unwrap();
        assert_eq!(trace.high, None);
        assert_eq!(trace.low, Some(5.0));
    }

    #[test]
    fn test_stock_table_missing_column() {
        let csv = b"Component,High Concentration\nGlc,100\n";
        let err = parse_stock_table(csv).unwrap_err();
        assert!(matches!(err, PrepError::MalformedTableError { .. }));
    }

    #[test]
    fn test_parse_standard_recipe_with_unit_header() {
        let csv = b"Component,Concentration[mM]\nMgSO4,2\nCaCl2,0.1\n";
        let recipe = parse_standard_recipe(csv).unwrap();
        let entries: Vec<_> = recipe.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, ComponentId::new("MgSO4"));
        assert_eq!(entries[0].1, 2.0);
    }

    #[test]
    fn test_parse_target_matrix() {
        let csv = b"Well,Glc,MgSO4\nA1,1.0,2.0\nA2,0,0.5\n";
        let matrix = parse_target_matrix(csv).unwrap();
        assert_eq!(matrix.components().len(), 2);
        assert_eq!(matrix.rows().len(), 2);
        assert_eq!(matrix.rows()[1].well, WellId::new("A2"));
        assert_eq!(matrix.rows()[1].targets, vec![0.0, 0.5]);
    }

    #[test]
    fn test_target_matrix_rejects_text_cells() {
        let csv = b"Well,Glc\nA1,plenty\n";
        assert!(parse_target_matrix(csv).is_err());
    }

    #[test]
    fn test_parse_plate_layout_keeps_order() {
        let csv = b"Well,Component\nA1,Glc\nA2,Glc\nB1,MgSO4\n";
        let layout = parse_plate_layout(csv, SourcePlate::StockHigh, "stock_plate_high").unwrap();
        // Duplicate labels are allowed; the first in layout order wins.
        assert_eq!(layout.find("Glc"), Some(&WellId::new("A1")));
        assert_eq!(layout.find("MgSO4"), Some(&WellId::new("B1")));
        assert_eq!(layout.find("Missing"), None);
    }

    #[test]
    fn test_volume_matrix_round_trip_shape() {
        use crate::domain::model::VolumeRow;
        let volumes = VolumeMatrix {
            components: vec![ComponentId::new("Glc")],
            rows: vec![VolumeRow {
                well: WellId::new("A1"),
                by_component: vec![15.0],
                water: 1470.0,
                culture: 15.0,
            }],
        };
        let bytes = volume_matrix_csv(&volumes).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Well,Glc,Water,Culture"));
        assert!(text.contains("A1,15.000,1470.000,15.000"));
    }
}

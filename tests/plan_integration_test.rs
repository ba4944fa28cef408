use mediaprep::adapters::tables;
use mediaprep::config::{InputPaths, PlanConfig};
use mediaprep::domain::model::{
    ComponentId, ConcentrationModel, PlanStep, PlanWarning, SourcePlate, StockLevel,
    TransferCategory, WellId,
};
use mediaprep::{plan_run, LocalStorage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_fixture(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

fn fixture_paths(dir: &TempDir) -> InputPaths {
    let dir = dir.path();
    InputPaths {
        stock: write_fixture(
            dir,
            "stock_concentrations.csv",
            "Component,High Concentration,Low Concentration\n\
             Glc,100,10\n\
             FeSO4,50,5\n\
             Kan,300,300\n\
             MgSO4,500,50\n",
        ),
        standard_recipe: write_fixture(
            dir,
            "standard_recipe_concentrations.csv",
            "Component,Concentration[mM]\nMgSO4,2.0\nKan,0.6\n",
        ),
        targets: write_fixture(
            dir,
            "target_concentrations.csv",
            "Well,Glc,FeSO4\nA1,1.0,0.1\nA2,0.0,0.0\nA3,2.0,0.02\n",
        ),
        plate_high: write_fixture(
            dir,
            "plate_high.csv",
            "Well,Component\nA1,Glc\nA2,MgSO4\nA3,Kan\n",
        ),
        plate_low: write_fixture(dir, "plate_low.csv", "Well,Component\nA1,Glc\nA2,MgSO4\n"),
        plate_fresh: write_fixture(
            dir,
            "plate_fresh.csv",
            "Well,Component\nA1,Culture\nB1,FeSO4\nC1,FeSO4\n",
        ),
    }
}

async fn plan_from_paths(
    paths: &InputPaths,
    config: &PlanConfig,
) -> mediaprep::Result<mediaprep::PlanOutcome> {
    let storage = LocalStorage::unrooted();
    let (stock, recipe, targets, layouts) = tables::load_inputs(&storage, paths).await?;
    let model = ConcentrationModel::assemble(stock, &recipe, targets, &config.policies)?;
    plan_run(&model, &layouts, config)
}

#[tokio::test]
async fn test_full_plan_from_csv_inputs() {
    let dir = TempDir::new().unwrap();
    let paths = fixture_paths(&dir);
    let config = PlanConfig::default();
    let outcome = plan_from_paths(&paths, &config).await.unwrap();

    assert!(outcome.warnings.is_empty());
    assert!(!outcome.degraded);

    // Recipe injection and stock alignment fix the column order.
    let expected: Vec<ComponentId> = ["Glc", "FeSO4", "Kan", "MgSO4"]
        .into_iter()
        .map(ComponentId::new)
        .collect();
    assert_eq!(outcome.volumes.components, expected);

    // Every well balances to the configured volume.
    for row in &outcome.volumes.rows {
        assert!((row.total() - config.well_volume).abs() <= config.volume_tolerance);
        assert_eq!(row.culture, 15.0);
    }

    // Fixed-dose antibiotic: 0.6 * 1500 / 300 = 3 uL in every well, always
    // from the high stock.
    for well in ["A1", "A2", "A3"] {
        assert_eq!(
            outcome
                .volumes
                .get(&WellId::new(well), &ComponentId::new("Kan")),
            Some(3.0)
        );
        assert_eq!(
            outcome
                .levels
                .get(&WellId::new(well), &ComponentId::new("Kan")),
            Some(StockLevel::High)
        );
    }

    // Zero targets leave empty, unleveled cells.
    assert_eq!(
        outcome
            .volumes
            .get(&WellId::new("A2"), &ComponentId::new("Glc")),
        Some(0.0)
    );
    assert_eq!(
        outcome
            .levels
            .get(&WellId::new("A2"), &ComponentId::new("Glc")),
        None
    );

    // A3's Glc demand (30 uL) exceeds the 15 uL acceptance ceiling at both
    // levels; the fallback keeps the high stock.
    assert_eq!(
        outcome
            .volumes
            .get(&WellId::new("A3"), &ComponentId::new("Glc")),
        Some(30.0)
    );
    assert_eq!(
        outcome
            .levels
            .get(&WellId::new("A3"), &ComponentId::new("Glc")),
        Some(StockLevel::High)
    );
}

#[tokio::test]
async fn test_plan_step_sequence() {
    let dir = TempDir::new().unwrap();
    let paths = fixture_paths(&dir);
    let config = PlanConfig::default();
    let outcome = plan_from_paths(&paths, &config).await.unwrap();

    let transfers: Vec<_> = outcome
        .steps
        .iter()
        .filter_map(|s| match s {
            PlanStep::Transfer(t) => Some(t),
            _ => None,
        })
        .collect();

    // 15 water sub-transfers (three ~1450 uL fills split five ways against
    // the 300 uL channel), 3 Kan, 2 Glc, 2 FeSO4, 3 MgSO4, 3 culture.
    assert_eq!(transfers.len(), 28);
    assert_eq!(outcome.steps.len(), 29);

    // Fixed category order.
    let category_rank = |c: TransferCategory| match c {
        TransferCategory::Water => 0,
        TransferCategory::FixedDose => 1,
        TransferCategory::Component => 2,
        TransferCategory::Culture => 3,
    };
    let ranks: Vec<u8> = transfers
        .iter()
        .map(|t| category_rank(t.category))
        .collect();
    let mut sorted = ranks.clone();
    sorted.sort();
    assert_eq!(ranks, sorted);

    // The checkpoint sits between the last component transfer and the first
    // culture transfer.
    let checkpoint = outcome
        .steps
        .iter()
        .position(|s| matches!(s, PlanStep::Checkpoint { .. }))
        .unwrap();
    let first_culture = outcome
        .steps
        .iter()
        .position(|s| matches!(s, PlanStep::Transfer(t) if t.category == TransferCategory::Culture))
        .unwrap();
    assert!(checkpoint < first_culture);

    // No instruction exceeds its channel capacity; every culture dispense
    // mixes.
    for t in &transfers {
        let cap = if t.channel == "p20" { 20.0 } else { 300.0 };
        assert!(t.volume <= cap);
        assert_eq!(
            t.mix_after.is_some(),
            t.category == TransferCategory::Culture
        );
    }

    // The fresh-plate component resolves to its fixed wells by level,
    // regardless of the layout table.
    let feso4: Vec<_> = transfers
        .iter()
        .filter(|t| t.column.label() == "FeSO4")
        .collect();
    assert_eq!(feso4.len(), 2);
    assert!(feso4
        .iter()
        .all(|t| t.source.plate == SourcePlate::StockFresh));
    // A1 chose high -> C1, A3 chose low -> B1.
    assert_eq!(feso4[0].dest_well, WellId::new("A1"));
    assert_eq!(feso4[0].source.well, WellId::new("C1"));
    assert_eq!(feso4[1].dest_well, WellId::new("A3"));
    assert_eq!(feso4[1].source.well, WellId::new("B1"));
}

#[tokio::test]
async fn test_resource_summary_totals() {
    let dir = TempDir::new().unwrap();
    let paths = fixture_paths(&dir);
    let config = PlanConfig::default();
    let outcome = plan_from_paths(&paths, &config).await.unwrap();

    // Water: 1458 + 1476 + 1440 demanded, plus the 100 uL dead volume.
    let water = outcome
        .resources
        .sources
        .iter()
        .find(|s| s.source.plate == SourcePlate::WaterReservoir)
        .unwrap();
    assert!((water.volume - 4474.0).abs() < 1e-6);

    // Kanamycin: 3 wells x 3 uL + dead volume.
    let kan = outcome
        .resources
        .sources
        .iter()
        .find(|s| s.label == "Kan")
        .unwrap();
    assert!((kan.volume - 109.0).abs() < 1e-6);

    // Tip accounting: one fresh tip per instruction.
    let p300 = outcome
        .resources
        .channels
        .iter()
        .find(|c| c.channel == "p300")
        .unwrap();
    assert_eq!(p300.transfers, 16);
    assert_eq!(p300.tips, 16);
    assert_eq!(p300.racks, 1);

    let p20 = outcome
        .resources
        .channels
        .iter()
        .find(|c| c.channel == "p20")
        .unwrap();
    assert_eq!(p20.transfers, 12);
}

#[tokio::test]
async fn test_replanning_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let paths = fixture_paths(&dir);
    let config = PlanConfig::default();
    let first = plan_from_paths(&paths, &config).await.unwrap();
    let second = plan_from_paths(&paths, &config).await.unwrap();

    assert_eq!(first.steps, second.steps);
    assert_eq!(
        serde_json::to_string(&first.steps).unwrap(),
        serde_json::to_string(&second.steps).unwrap()
    );
}

#[tokio::test]
async fn test_missing_generic_source_warns_and_completes() {
    let dir = TempDir::new().unwrap();
    let paths = fixture_paths(&dir);
    // Remove Glc from the high plate; A1 (15 uL, high) and A3 (30 uL, high)
    // lose their transfers, everything else survives.
    write_fixture(
        dir.path(),
        "plate_high.csv",
        "Well,Component\nA2,MgSO4\nA3,Kan\n",
    );

    let config = PlanConfig::default();
    let outcome = plan_from_paths(&paths, &config).await.unwrap();

    let unresolved: Vec<_> = outcome
        .warnings
        .iter()
        .filter(|w| matches!(w, PlanWarning::UnresolvedSource { .. }))
        .collect();
    assert_eq!(unresolved.len(), 2);

    let transfers: Vec<_> = outcome
        .steps
        .iter()
        .filter_map(|s| match s {
            PlanStep::Transfer(t) => Some(t),
            _ => None,
        })
        .collect();
    assert!(transfers.iter().all(|t| t.column.label() != "Glc"));
    // The rest of the plan is unaffected: 28 - 2 Glc transfers.
    assert_eq!(transfers.len(), 26);
    // Source-resolution warnings do not degrade the produced volumes.
    assert!(!outcome.degraded);
}

#[tokio::test]
async fn test_component_without_stock_is_fatal() {
    let dir = TempDir::new().unwrap();
    let paths = fixture_paths(&dir);
    // Target references a component the stock table does not carry.
    write_fixture(
        dir.path(),
        "target_concentrations.csv",
        "Well,Glc,Unknown\nA1,1.0,0.5\n",
    );

    let storage = LocalStorage::unrooted();
    let config = PlanConfig::default();
    let (stock, recipe, targets, _layouts) = tables::load_inputs(&storage, &paths).await.unwrap();
    let err = ConcentrationModel::assemble(stock, &recipe, targets, &config.policies).unwrap_err();
    assert!(matches!(
        err,
        mediaprep::PrepError::MissingStockError { .. }
    ));
}

use crate::utils::error::{PrepError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Chemical component identifier, as declared in the stock table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plate well identifier ("A1", "C12").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WellId(String);

impl WellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which pre-mixed stock concentration a transfer draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    High,
    Low,
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// One row of the stock table. An absent or non-positive concentration in the
/// input counts as "no stock at that level".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: ComponentId,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

/// Stock concentrations in declared order. The declared order fixes the
/// column order of every downstream matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTable {
    entries: Vec<StockEntry>,
}

impl StockTable {
    pub fn new(entries: Vec<StockEntry>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.clone()) {
                return Err(PrepError::MalformedTableError {
                    table: "stock_concentrations".to_string(),
                    reason: format!("duplicate component '{}'", entry.id),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, id: &ComponentId) -> Option<&StockEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn entries(&self) -> &[StockEntry] {
        &self.entries
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentId> {
        self.entries.iter().map(|e| &e.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Base recipe: concentrations applied to every well for components the
/// target matrix does not itself vary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardRecipe {
    entries: Vec<(ComponentId, f64)>,
}

impl StandardRecipe {
    pub fn new(entries: Vec<(ComponentId, f64)>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ComponentId, f64)> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRow {
    pub well: WellId,
    pub targets: Vec<f64>,
}

/// Desired concentration per (destination well, component).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetMatrix {
    components: Vec<ComponentId>,
    rows: Vec<TargetRow>,
}

impl TargetMatrix {
    pub fn new(components: Vec<ComponentId>, rows: Vec<TargetRow>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for row in &rows {
            if !seen.insert(row.well.clone()) {
                return Err(PrepError::MalformedTableError {
                    table: "target_concentrations".to_string(),
                    reason: format!("duplicate destination well '{}'", row.well),
                });
            }
            if row.targets.len() != components.len() {
                return Err(PrepError::MalformedTableError {
                    table: "target_concentrations".to_string(),
                    reason: format!(
                        "row '{}' has {} values, expected {}",
                        row.well,
                        row.targets.len(),
                        components.len()
                    ),
                });
            }
            if let Some(bad) = row.targets.iter().find(|t| !t.is_finite() || **t < 0.0) {
                return Err(PrepError::MalformedTableError {
                    table: "target_concentrations".to_string(),
                    reason: format!(
                        "row '{}' has invalid target concentration {}",
                        row.well, bad
                    ),
                });
            }
        }
        Ok(Self { components, rows })
    }

    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    pub fn rows(&self) -> &[TargetRow] {
        &self.rows
    }
}

/// How a component's transfer volume and source are resolved.
///
/// `FixedDose` always uses the high-stock formula, skipping the bound checks
/// and fallback of the generic algorithm (used for the antibiotic).
/// `FixedSource` keeps the generic volume math but draws from hardcoded
/// fresh-plate wells instead of the layout tables (used for a reagent stored
/// pre-diluted at fixed positions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    Generic,
    FixedDose,
    FixedSource { low_well: WellId, high_well: WellId },
}

/// Per-component resolution policies. Components without an entry are
/// `Generic`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyTable {
    by_component: HashMap<String, ResolutionPolicy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The policy set of the lab's standard media-prep run: kanamycin is
    /// fixed-dose, iron sulfate lives pre-diluted on the fresh plate.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.insert(ComponentId::new("Kan"), ResolutionPolicy::FixedDose);
        table.insert(
            ComponentId::new("FeSO4"),
            ResolutionPolicy::FixedSource {
                low_well: WellId::new("B1"),
                high_well: WellId::new("C1"),
            },
        );
        table
    }

    pub fn insert(&mut self, id: ComponentId, policy: ResolutionPolicy) {
        self.by_component.insert(id.as_str().to_string(), policy);
    }

    pub fn policy_for(&self, id: &ComponentId) -> &ResolutionPolicy {
        self.by_component
            .get(id.as_str())
            .unwrap_or(&ResolutionPolicy::Generic)
    }

    /// The fixed-dose component, if one is configured.
    pub fn fixed_dose_component(&self) -> Option<ComponentId> {
        let mut ids: Vec<&String> = self
            .by_component
            .iter()
            .filter(|(_, p)| **p == ResolutionPolicy::FixedDose)
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids.first().map(|id| ComponentId::new(id.as_str()))
    }
}

/// Stock table and target matrix, joined and normalized: recipe components
/// injected, column order aligned to the stock table, stock coverage checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentrationModel {
    stock: StockTable,
    targets: TargetMatrix,
}

impl ConcentrationModel {
    pub fn assemble(
        stock: StockTable,
        recipe: &StandardRecipe,
        targets: TargetMatrix,
        policies: &PolicyTable,
    ) -> Result<Self> {
        if stock.is_empty() {
            return Err(PrepError::MalformedTableError {
                table: "stock_concentrations".to_string(),
                reason: "table is empty".to_string(),
            });
        }

        // Inject recipe components the caller did not vary: every well gets
        // the recipe concentration.
        let mut components = targets.components.clone();
        let mut rows = targets.rows.clone();
        for (id, concentration) in recipe.iter() {
            if components.contains(id) {
                continue;
            }
            components.push(id.clone());
            for row in &mut rows {
                row.targets.push(*concentration);
            }
        }

        // Column set must exactly match the stock set after injection.
        for id in &components {
            if stock.get(id).is_none() {
                return Err(PrepError::MissingStockError {
                    component: id.as_str().to_string(),
                });
            }
        }
        for id in stock.components() {
            if !components.contains(id) {
                return Err(PrepError::MalformedTableError {
                    table: "target_concentrations".to_string(),
                    reason: format!(
                        "no target column for stock component '{}' (add it to the target matrix or the standard recipe)",
                        id
                    ),
                });
            }
        }

        // Reorder columns to the stock table's declared order.
        let order: Vec<usize> = stock
            .components()
            .map(|id| components.iter().position(|c| c == id).unwrap())
            .collect();
        let aligned_components: Vec<ComponentId> = stock.components().cloned().collect();
        let aligned_rows: Vec<TargetRow> = rows
            .into_iter()
            .map(|row| TargetRow {
                well: row.well,
                targets: order.iter().map(|&i| row.targets[i]).collect(),
            })
            .collect();

        // Every referenced component needs at least one usable stock level;
        // a fixed-dose component specifically needs the high level. Aligned
        // column order equals stock order, so the index carries over.
        for (idx, entry) in stock.entries().iter().enumerate() {
            let referenced = aligned_rows.iter().any(|row| row.targets[idx] > 0.0);
            if !referenced {
                continue;
            }
            let usable = match policies.policy_for(&entry.id) {
                ResolutionPolicy::FixedDose => entry.high.is_some(),
                _ => entry.high.is_some() || entry.low.is_some(),
            };
            if !usable {
                return Err(PrepError::MissingStockError {
                    component: entry.id.as_str().to_string(),
                });
            }
        }

        Ok(Self {
            stock,
            targets: TargetMatrix {
                components: aligned_components,
                rows: aligned_rows,
            },
        })
    }

    pub fn stock(&self) -> &StockTable {
        &self.stock
    }

    pub fn targets(&self) -> &TargetMatrix {
        &self.targets
    }

    pub fn components(&self) -> &[ComponentId] {
        &self.targets.components
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRow {
    pub well: WellId,
    pub by_component: Vec<f64>,
    pub water: f64,
    pub culture: f64,
}

impl VolumeRow {
    pub fn total(&self) -> f64 {
        self.by_component.iter().sum::<f64>() + self.water + self.culture
    }
}

/// Transfer volumes (uL) per destination well: one column per component plus
/// the synthetic Water and Culture columns. Every row sums to the configured
/// well volume within tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeMatrix {
    pub components: Vec<ComponentId>,
    pub rows: Vec<VolumeRow>,
}

impl VolumeMatrix {
    pub fn get(&self, well: &WellId, component: &ComponentId) -> Option<f64> {
        let idx = self.components.iter().position(|c| c == component)?;
        self.rows
            .iter()
            .find(|r| &r.well == well)
            .map(|r| r.by_component[idx])
    }

    /// Uniform by construction; taken from the first row.
    pub fn culture_volume(&self) -> Option<f64> {
        self.rows.first().map(|r| r.culture)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelRow {
    pub well: WellId,
    pub levels: Vec<Option<StockLevel>>,
}

/// Chosen stock level per (well, component), parallel to the component
/// columns of the volume matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelMatrix {
    pub components: Vec<ComponentId>,
    pub rows: Vec<LevelRow>,
}

impl LevelMatrix {
    pub fn get(&self, well: &WellId, component: &ComponentId) -> Option<StockLevel> {
        let idx = self.components.iter().position(|c| c == component)?;
        self.rows
            .iter()
            .find(|r| &r.well == well)
            .and_then(|r| r.levels[idx])
    }
}

/// Physical source plate a transfer aspirates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePlate {
    StockHigh,
    StockLow,
    StockFresh,
    WaterReservoir,
}

impl fmt::Display for SourcePlate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StockHigh => write!(f, "stock_high"),
            Self::StockLow => write!(f, "stock_low"),
            Self::StockFresh => write!(f, "stock_fresh"),
            Self::WaterReservoir => write!(f, "water_reservoir"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateSlot {
    pub well: WellId,
    pub label: String,
}

/// Which component occupies each well of a source plate. Multiple wells may
/// hold the same label; the first match in layout order wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateLayout {
    pub plate: SourcePlate,
    pub slots: Vec<PlateSlot>,
}

impl PlateLayout {
    pub fn new(plate: SourcePlate, slots: Vec<PlateSlot>) -> Self {
        Self { plate, slots }
    }

    pub fn find(&self, label: &str) -> Option<&WellId> {
        self.slots
            .iter()
            .find(|slot| slot.label == label)
            .map(|slot| &slot.well)
    }
}

/// The three stock plates a run draws reagents from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateLayouts {
    pub high: PlateLayout,
    pub low: PlateLayout,
    pub fresh: PlateLayout,
}

impl PlateLayouts {
    pub fn for_level(&self, level: StockLevel) -> &PlateLayout {
        match level {
            StockLevel::High => &self.high,
            StockLevel::Low => &self.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAddress {
    pub plate: SourcePlate,
    pub well: WellId,
}

impl fmt::Display for SourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.plate, self.well)
    }
}

/// Post-dispense mix action (re-suspension).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixAfter {
    pub repetitions: u32,
    pub volume: f64,
}

/// The four fixed transfer categories, in plan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferCategory {
    Water,
    FixedDose,
    Component,
    Culture,
}

impl fmt::Display for TransferCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Water => write!(f, "water"),
            Self::FixedDose => write!(f, "fixed-dose"),
            Self::Component => write!(f, "component"),
            Self::Culture => write!(f, "culture"),
        }
    }
}

/// Matrix column a transfer fills: a component, or one of the synthetic
/// columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Component(ComponentId),
    Water,
    Culture,
}

impl Column {
    pub fn label(&self) -> &str {
        match self {
            Self::Component(id) => id.as_str(),
            Self::Water => "Water",
            Self::Culture => "Culture",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipette channel selection: automatic capacity-based choice, or an explicit
/// named channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelSelect {
    Auto,
    Channel(String),
}

/// A pipette channel and the largest volume it can deliver in one transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipetteChannel {
    pub name: String,
    pub max_volume: f64,
}

/// A logical transfer before channel assignment and capacity splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub category: TransferCategory,
    pub column: Column,
    pub source: SourceAddress,
    pub dest_well: WellId,
    pub volume: f64,
    pub channel: ChannelSelect,
    pub mix_after: Option<MixAfter>,
}

/// One atomic pipetting instruction. Every instruction uses a fresh tip; tip
/// reuse across instructions is never permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferInstruction {
    pub category: TransferCategory,
    pub column: Column,
    pub source: SourceAddress,
    pub dest_well: WellId,
    pub volume: f64,
    pub channel: String,
    pub mix_after: Option<MixAfter>,
}

/// An entry in the ordered plan: a transfer, or the operator checkpoint that
/// precedes the culture category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStep {
    Transfer(TransferInstruction),
    Checkpoint { message: String },
}

/// Recoverable conditions accumulated during planning. Every skipped transfer
/// is represented here; nothing is dropped silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlanWarning {
    VolumeImbalance {
        well: WellId,
        total: f64,
        expected: f64,
    },
    UnresolvedSource {
        well: WellId,
        component: ComponentId,
        level: StockLevel,
    },
    CategorySkipped {
        category: TransferCategory,
        reason: String,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VolumeImbalance {
                well,
                total,
                expected,
            } => write!(
                f,
                "well {} totals {:.2} uL, expected {:.2} uL",
                well, total, expected
            ),
            Self::UnresolvedSource {
                well,
                component,
                level,
            } => write!(
                f,
                "no {} source well for component '{}' (destination {})",
                level, component, well
            ),
            Self::CategorySkipped { category, reason } => {
                write!(f, "{} category skipped: {}", category, reason)
            }
        }
    }
}

/// Aggregate demand on one source well, dead volume included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUsage {
    pub source: SourceAddress,
    pub label: String,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelUsage {
    pub channel: String,
    pub transfers: u32,
    pub tips: u32,
    pub racks: u32,
}

/// Provisioning summary. Advisory only; never feeds back into planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub sources: Vec<SourceUsage>,
    pub channels: Vec<ChannelUsage>,
}

/// Everything one planning pass produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub volumes: VolumeMatrix,
    pub levels: LevelMatrix,
    pub steps: Vec<PlanStep>,
    pub resources: ResourceSummary,
    pub warnings: Vec<PlanWarning>,
    pub degraded: bool,
}

/// Counters reported by the protocol runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub dispensed: u32,
    pub checkpoints: u32,
}

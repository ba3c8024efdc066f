use std::fmt;

// Identifies one site x soil x year x crop-file run in diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScenarioId {
    pub site: String,
    pub soil: u16,
    pub year: i32,
    pub crop_file: String,
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "site {} soil {} year {} crop file {}",
            self.site, self.soil, self.year, self.crop_file
        )
    }
}

/// Errors that abort the scenario currently being simulated.
///
/// None of these are retried; the batch driver decides whether to move on
/// to the next scenario.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The transpiration uptake loop hit its iteration bound.
    #[error("uptake loop failed to converge on day {day}, residual demand {residual:.4} in")]
    ConvergenceFailure { day: u32, residual: f64 },

    /// Inputs or parameters drove the water balance outside its valid domain.
    #[error("physically inconsistent state on day {day}: {detail}")]
    PhysicalInconsistency { day: u32, detail: String },

    /// A soil, crop, tillage or weather lookup could not be resolved.
    #[error("missing reference data: {0}")]
    MissingReferenceData(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{id}: {source}")]
    Scenario {
        id: ScenarioId,
        #[source]
        source: Box<SimError>,
    },
}

impl SimError {
    // Attach the scenario identity unless it is already present
    pub fn in_scenario(self, id: &ScenarioId) -> SimError {
        match self {
            SimError::Scenario { .. } => self,
            other => SimError::Scenario {
                id: id.clone(),
                source: Box::new(other),
            },
        }
    }

    // The innermost error, skipping the scenario wrapper
    pub fn root(&self) -> &SimError {
        match self {
            SimError::Scenario { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<toml::de::Error> for SimError {
    fn from(err: toml::de::Error) -> Self {
        SimError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SimError {
    fn from(err: toml::ser::Error) -> Self {
        SimError::Config(err.to_string())
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

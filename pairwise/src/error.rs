use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum MiningError {
    #[error("minimum support must be a finite percentage greater than 0, got {value}")]
    InvalidMinSupport { value: f64 },

    #[error("cannot compute support during {stage}: zero distinct transactions")]
    ZeroTransactions { stage: &'static str },

    #[error(
        "input not grouped by transaction: transaction {transaction_id} reappears at record {position} after another transaction started"
    )]
    ContractViolation { transaction_id: i64, position: usize },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("cannot {operation} in phase {phase}")]
    PhaseOrder {
        operation: &'static str,
        phase: String,
    },

    #[error("pair table memory budget exceeded: requested {requested} bytes, {available} available")]
    MemoryBudgetExceeded { requested: usize, available: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, MiningError>;

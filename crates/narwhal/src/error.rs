#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown integration scheme: {value:?} (expected \"euler\" or \"verlet\")")]
    UnknownIntegration { value: String },

    #[error("unknown approximation: {value:?} (expected \"none\" or \"barnes-hut\")")]
    UnknownApproximation { value: String },

    #[error("unknown initial positions strategy: {value:?} (expected \"circle\" or \"random\")")]
    UnknownInitialPositions { value: String },

    #[error("invalid layout option `{name}`: {value}")]
    InvalidOption { name: &'static str, value: f64 },

    #[error("invalid layout configuration: {message}")]
    InvalidConfig { message: String },

    #[error("graph contains a link with a missing endpoint: {link_id}")]
    MissingEndpoint { link_id: String },

    #[error("node is already part of the layout: {node_id}")]
    DuplicateNode { node_id: String },

    #[error("node is not part of the layout: {node_id}")]
    UnknownNode { node_id: String },

    #[error("graph client is not attached to a layout")]
    Detached,
}

pub type Result<T> = std::result::Result<T, Error>;

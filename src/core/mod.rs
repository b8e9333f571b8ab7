// Scoring pipeline stages and shared errors/models
pub mod features {
    pub use crate::features::*;
}

pub mod imputer {
    pub use crate::imputer::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}

pub mod predictor {
    pub use crate::predictor::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}

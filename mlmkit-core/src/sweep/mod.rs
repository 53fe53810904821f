//! Sweep configuration: the declarative search space handed to the external
//! sweep service for the text-classification fine-tuning stage.

pub mod document;
pub mod space;

pub use document::{
    EarlyStopping, FixedSection, GeneralSection, Goal, SearchMethod, SwaSchedule, SweepDocument,
    SweepMetric, SweepSection,
};
pub use space::{Assignment, Distribution, ParamSpec, ParamValue, SweepSpace};

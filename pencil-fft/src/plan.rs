//! Geometric planning: box algebra, partitions, and the logic planner.
pub mod box3;
pub mod logic;
pub mod partition;
pub mod types;

pub use box3::{Box3, NATURAL_ORDER};
pub use logic::plan_logic;
pub use partition::{gather_boxes, validate_partition};
pub use types::{LogicPlan, PlanOptions, TransportKind};

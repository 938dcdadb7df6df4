mod work_item;

pub use work_item::{WorkItem, WorkPlan};

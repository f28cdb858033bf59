pub mod attendance;
pub mod correction;
pub mod schedule_assignment;
pub mod work_rule;

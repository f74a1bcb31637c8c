pub mod color_sort;
pub mod foreground_flows;
pub mod lift_motion;
pub mod rig;
pub mod session_lifecycle;

pub mod drawing;
pub mod weekly_chart;

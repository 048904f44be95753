pub mod backtest;
pub mod recommendations;

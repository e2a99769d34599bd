// API Routes Module

pub mod certificates;
pub mod clusters;
pub mod health;
pub mod scans;

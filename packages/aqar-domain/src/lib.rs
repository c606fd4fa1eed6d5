pub mod criteria;
pub mod merge;
pub mod proximity;
pub mod resolve;
pub mod similarity;
pub mod text;

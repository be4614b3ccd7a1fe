pub mod feedback;
pub mod status;

pub mod home;
pub mod orders;

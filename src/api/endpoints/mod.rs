pub mod camera;
pub mod capture;
pub mod crop;
pub mod form;
pub mod health;
pub mod session;

pub mod de;
pub mod device;
pub mod preferences;
pub mod route;

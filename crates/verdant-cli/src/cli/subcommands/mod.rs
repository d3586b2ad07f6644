mod catalogue;
mod pref;

pub use catalogue::CatalogueCommands;
pub use pref::PrefCommands;

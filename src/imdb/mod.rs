pub mod locator;
pub mod markup;
pub mod model;
pub mod module;
pub mod source;

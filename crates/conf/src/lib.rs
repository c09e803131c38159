//! Configuration object and loading for the query mediator process.
mod loading;
mod object;

pub use self::loading::load;
pub use self::loading::Error;
pub use self::object::Conf;
pub use self::object::ServiceConf;

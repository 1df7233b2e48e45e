pub(crate) mod forecast;
pub(crate) mod fundamental;
pub(crate) mod health;
pub(crate) mod news;
pub(crate) mod technical;

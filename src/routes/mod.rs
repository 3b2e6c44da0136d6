pub(crate) mod factsheet;
pub(crate) mod health;
pub(crate) mod index;

pub(crate) mod distribution;
pub(crate) mod m2_cache;

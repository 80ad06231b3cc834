pub(crate) mod host;
pub(crate) use host::{Call, FakeHost, Method};

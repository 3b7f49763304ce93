// parlor-common: wire protocol and text rules shared by the Parlor relay and its clients

pub mod protocol;
pub mod text;

//! DNS collaborator, network ranges and domain helpers used by the SPF core.

pub mod cidr;
pub mod dns;
pub mod domain;

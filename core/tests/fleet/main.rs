mod desktops;
mod groups;
mod licensing;
mod pagination;
mod policy;
mod provisioning;

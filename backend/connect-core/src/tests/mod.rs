mod coins;
mod config;
mod device_commands;
mod firmware_update;
mod format;
mod logger;
mod params;
mod path;
mod sessions;
mod support;
mod typed_data;

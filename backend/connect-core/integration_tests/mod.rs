mod dispatch;
mod helpers;
mod ipc_tests;
mod methods;

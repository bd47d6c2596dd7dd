pub mod history_route;

/// Integration tests against on-disk SQLite databases
mod completion_flow;
mod server_flow;

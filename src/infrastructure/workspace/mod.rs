pub mod json_workspace;

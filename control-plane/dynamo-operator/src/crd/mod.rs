pub mod nim_deployment;

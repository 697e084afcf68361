mod ephemeral_ports_test;
mod fixed_ports_test;

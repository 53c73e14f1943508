pub mod generate_dump_commands;

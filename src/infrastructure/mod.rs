pub mod dump_script;
#[cfg(feature = "mysql")]
pub mod mysql_introspector;
pub mod mysqldump_template;

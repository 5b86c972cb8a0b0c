pub mod rc_io;

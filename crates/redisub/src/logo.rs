pub const LOGO: &str = r#"
 ┏━┓┏━╸╺┳┓╻┏━┓╻ ╻┏┓
 ┣┳┛┣╸  ┃┃┃┗━┓┃ ┃┣┻┓
 ╹┗╸┗━╸╺┻┛╹┗━┛┗━┛┗━┛
"#;

/// Version string shown by `--version`, including build details.
pub const LONG_VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	" (",
	env!("REDISUB_GIT_HASH"),
	env!("REDISUB_GIT_DIRTY"),
	", built ",
	env!("REDISUB_BUILD_DATE"),
	")\n",
	env!("REDISUB_RUSTC_VERSION"),
	"\ntarget: ",
	env!("REDISUB_TARGET"),
);

pub fn show_logo(url: &str) {
	let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

	let info = format!(
		r#"Version:     v{} ({}{})
Server:      {}
Started:     {}"#,
		env!("CARGO_PKG_VERSION"),
		env!("REDISUB_GIT_HASH"),
		env!("REDISUB_GIT_DIRTY"),
		url,
		now
	);

	println!("{}\n{}\n", LOGO.trim_end(), info);
}

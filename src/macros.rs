/// Evaluates a block. With the `stats` feature the elapsed time is logged at
/// debug level under `$name`.
macro_rules! timed {
    ($name:literal, $block:block) => {{
        #[cfg(feature = "stats")]
        let started = std::time::Instant::now();

        let value = $block;

        #[cfg(feature = "stats")]
        bevy::log::debug!("{} took {:?}", $name, started.elapsed());

        value
    }};
}

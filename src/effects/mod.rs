/// Scene-to-scene transition styles.
pub mod transitions;

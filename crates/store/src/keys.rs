//! Key-space layout, namespaced per plugin instance.

use auris_core::JobId;

pub(crate) fn job(namespace: &str, id: JobId) -> String {
    format!("{namespace}:job:{id}")
}

pub(crate) fn status(namespace: &str, id: JobId) -> String {
    format!("{namespace}:job:{id}:status")
}

pub(crate) fn subject(namespace: &str, subject_id: &str) -> String {
    format!("{namespace}:track:{subject_id}")
}

pub(crate) fn active_ids(namespace: &str) -> String {
    format!("{namespace}:active_ids")
}

pub(crate) fn cooldown(namespace: &str) -> String {
    format!("{namespace}:cooldown")
}

pub(crate) fn recent_ids(namespace: &str) -> String {
    format!("{namespace}:recent_ids")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn keys_are_namespaced() {
        let id = Uuid::nil();
        assert_eq!(job("embed", id), format!("embed:job:{id}"));
        assert_eq!(subject("embed", "T1"), "embed:track:T1");
        assert_eq!(active_ids("embed"), "embed:active_ids");
        assert_eq!(cooldown("embed"), "embed:cooldown");
        assert_eq!(recent_ids("embed"), "embed:recent_ids");
    }
}

use crate::model::{DebugHelper, EventInfo, PodInfo, Severity};

const HIGH_RESTART_THRESHOLD: i32 = 5;

/// Derives troubleshooting hints from a pod's container states and its
/// recent events. Most severe first.
pub fn analyze_pod_issues(pod: &PodInfo, events: &[EventInfo]) -> Vec<DebugHelper> {
    let mut helpers = Vec::new();
    let target = format!("{} -n {}", pod.name, pod.namespace);

    for container in &pod.containers {
        let reason = container.reason.as_deref().unwrap_or_default();
        let crash_looping = reason == "CrashLoopBackOff";

        if crash_looping {
            let last = container
                .last_terminated_reason
                .as_deref()
                .map(|reason| format!(" (last exit: {reason})"))
                .unwrap_or_default();
            helpers.push(DebugHelper {
                severity: Severity::Critical,
                title: format!("{} is crash looping", container.name),
                detail: format!(
                    "Container restarted {} times{last}.",
                    container.restarts
                ),
                hint: Some(format!(
                    "kubectl logs {target} -c {} --previous",
                    container.name
                )),
            });
        }

        if matches!(reason, "ImagePullBackOff" | "ErrImagePull" | "InvalidImageName") {
            helpers.push(DebugHelper {
                severity: Severity::Critical,
                title: format!("{} cannot pull its image", container.name),
                detail: format!(
                    "{reason}: check that '{}' exists and pull secrets are set.",
                    container.image
                ),
                hint: Some(format!("kubectl describe pod {target}")),
            });
        }

        if reason == "OOMKilled" || container.last_terminated_reason.as_deref() == Some("OOMKilled")
        {
            helpers.push(DebugHelper {
                severity: Severity::Critical,
                title: format!("{} was OOMKilled", container.name),
                detail: "The container exceeded its memory limit.".to_string(),
                hint: Some(format!("kubectl top pod {target} --containers")),
            });
        }

        if !crash_looping && container.restarts > HIGH_RESTART_THRESHOLD {
            helpers.push(DebugHelper {
                severity: Severity::Warning,
                title: format!("{} restarts frequently", container.name),
                detail: format!("{} restarts so far.", container.restarts),
                hint: Some(format!(
                    "kubectl logs {target} -c {} --previous",
                    container.name
                )),
            });
        }

        if pod.phase == "Running" && !container.ready && !crash_looping {
            helpers.push(DebugHelper {
                severity: Severity::Warning,
                title: format!("{} is not ready", container.name),
                detail: "Readiness probe has not passed yet.".to_string(),
                hint: None,
            });
        }
    }

    if pod.phase == "Pending" {
        match events
            .iter()
            .find(|event| event.reason == "FailedScheduling")
        {
            Some(event) => helpers.push(DebugHelper {
                severity: Severity::Warning,
                title: "Pod cannot be scheduled".to_string(),
                detail: event.message.clone(),
                hint: Some(format!("kubectl describe pod {target}")),
            }),
            None => helpers.push(DebugHelper {
                severity: Severity::Info,
                title: "Pod is pending".to_string(),
                detail: "Waiting for scheduling or volume binding.".to_string(),
                hint: Some(format!("kubectl get events -n {}", pod.namespace)),
            }),
        }
    }

    if let Some(event) = events
        .iter()
        .find(|event| event.reason == "Unhealthy" && event.is_warning())
    {
        helpers.push(DebugHelper {
            severity: Severity::Warning,
            title: "Health probe failing".to_string(),
            detail: event.message.clone(),
            hint: None,
        });
    }

    helpers.sort_by_key(|helper| helper.severity);
    helpers
}

#[cfg(test)]
mod tests {
    use super::analyze_pod_issues;
    use crate::model::{ContainerInfo, EventInfo, PodInfo, Severity};

    fn pod(phase: &str, containers: Vec<ContainerInfo>) -> PodInfo {
        PodInfo {
            name: "api-abc".to_string(),
            namespace: "prod".to_string(),
            phase: phase.to_string(),
            containers,
            ..PodInfo::default()
        }
    }

    fn container(name: &str, ready: bool, restarts: i32, reason: Option<&str>) -> ContainerInfo {
        ContainerInfo {
            name: name.to_string(),
            image: "registry/api:1.0".to_string(),
            ready,
            restarts,
            state: "Waiting".to_string(),
            reason: reason.map(str::to_string),
            last_terminated_reason: None,
        }
    }

    fn event(event_type: &str, reason: &str, message: &str) -> EventInfo {
        EventInfo {
            event_type: event_type.to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            count: 1,
            last_seen: None,
        }
    }

    #[test]
    fn healthy_pod_has_no_hints() {
        let pod = pod("Running", vec![container("app", true, 0, None)]);
        assert!(analyze_pod_issues(&pod, &[]).is_empty());
    }

    #[test]
    fn crash_loop_suggests_previous_logs() {
        let mut app = container("app", false, 9, Some("CrashLoopBackOff"));
        app.last_terminated_reason = Some("Error".to_string());
        let helpers = analyze_pod_issues(&pod("Running", vec![app]), &[]);
        assert_eq!(helpers.len(), 1);
        assert_eq!(helpers[0].severity, Severity::Critical);
        assert_eq!(helpers[0].detail, "Container restarted 9 times (last exit: Error).");
        assert_eq!(
            helpers[0].hint.as_deref(),
            Some("kubectl logs api-abc -n prod -c app --previous")
        );
    }

    #[test]
    fn image_pull_failure_is_critical() {
        let helpers = analyze_pod_issues(
            &pod("Pending", vec![container("app", false, 0, Some("ImagePullBackOff"))]),
            &[],
        );
        assert_eq!(helpers[0].title, "app cannot pull its image");
        assert!(helpers.iter().any(|helper| helper.title == "Pod is pending"));
    }

    #[test]
    fn oom_kill_detected_from_last_termination() {
        let mut app = container("app", true, 1, None);
        app.last_terminated_reason = Some("OOMKilled".to_string());
        let helpers = analyze_pod_issues(&pod("Running", vec![app]), &[]);
        assert_eq!(helpers.len(), 1);
        assert_eq!(helpers[0].title, "app was OOMKilled");
    }

    #[test]
    fn scheduling_failure_uses_event_message() {
        let events = vec![event(
            "Warning",
            "FailedScheduling",
            "0/3 nodes are available: insufficient cpu.",
        )];
        let helpers = analyze_pod_issues(&pod("Pending", Vec::new()), &events);
        assert_eq!(helpers.len(), 1);
        assert_eq!(helpers[0].title, "Pod cannot be scheduled");
        assert_eq!(helpers[0].detail, "0/3 nodes are available: insufficient cpu.");
    }

    #[test]
    fn restarts_and_probes_raise_warnings_sorted_after_critical() {
        let mut app = container("app", false, 12, None);
        app.last_terminated_reason = Some("OOMKilled".to_string());
        let events = vec![event("Warning", "Unhealthy", "Readiness probe failed: 503")];
        let helpers = analyze_pod_issues(&pod("Running", vec![app]), &events);
        let severities = helpers.iter().map(|helper| helper.severity).collect::<Vec<_>>();
        assert_eq!(
            severities,
            vec![
                Severity::Critical,
                Severity::Warning,
                Severity::Warning,
                Severity::Warning
            ]
        );
        assert!(helpers.iter().any(|helper| helper.title == "Health probe failing"));
        assert!(helpers.iter().any(|helper| helper.title == "app is not ready"));
    }
}

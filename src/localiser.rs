use crate::{
    error::ErrorWrapper, messages::PoseMessage, navigation::Pose2d, util::restart_on_failure,
};
use anyhow::Result;
use nalgebra as na;
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tracing::{info, warn};
use zenoh::{prelude::r#async::*, subscriber::FlumeSubscriber, Session, SessionDeclarations};

/// Position and orientation as delivered by the pose source.
///
/// The quaternion is used as is, samples are assumed to be validated upstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    position: na::Point3<f32>,
    orientation: na::Quaternion<f32>,
}

impl PoseSample {
    pub fn new(position: na::Point3<f32>, orientation: na::Quaternion<f32>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Sample for a robot standing flat on the ground plane
    pub fn from_planar(x: f32, y: f32, yaw: f32) -> Self {
        Self {
            position: na::Point3::new(x, y, 0.0),
            orientation: na::UnitQuaternion::from_euler_angles(0.0, 0.0, yaw).into_inner(),
        }
    }

    pub fn position(&self) -> &na::Point3<f32> {
        &self.position
    }

    pub fn orientation(&self) -> &na::Quaternion<f32> {
        &self.orientation
    }

    pub fn to_pose(&self) -> Pose2d {
        Pose2d::from_na(self.position.xy(), yaw_from_quaternion(&self.orientation))
    }
}

/// Planar yaw of a rotation, assumes roll and pitch are close to zero
pub fn yaw_from_quaternion(q: &na::Quaternion<f32>) -> f32 {
    let siny = 2.0 * (q.w * q.k + q.i * q.j);
    let cosy = 1.0 - 2.0 * (q.j * q.j + q.k * q.k);
    siny.atan2(cosy)
}

/// Latest known robot pose.
///
/// Cloning gives another handle to the same pose. Writers replace the whole
/// pose under the lock so readers never see a half written one.
#[derive(Debug, Clone, Default)]
pub struct PoseTracker {
    pose: Arc<Mutex<Pose2d>>,
}

impl PoseTracker {
    pub fn new(initial: Pose2d) -> Self {
        Self {
            pose: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn update(&self, sample: &PoseSample) {
        self.set(sample.to_pose());
    }

    pub fn set(&self, pose: Pose2d) {
        // a poisoned lock still holds a whole pose
        *self.pose.lock().unwrap_or_else(PoisonError::into_inner) = pose;
    }

    pub fn read(&self) -> Pose2d {
        *self.pose.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

static POSE_LISTENER_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Feed pose samples from `topic` into `tracker`.
///
/// The first subscription is made before returning so a broken session fails
/// startup. Afterwards the listener is redeclared whenever it dies.
pub async fn start_pose_subscriber(
    zenoh_session: Arc<Session>,
    topic: &str,
    tracker: PoseTracker,
) -> Result<()> {
    let mut first_subscriber = Some(declare_pose_subscriber(&zenoh_session, topic).await?);
    info!("Listening for poses on {}", topic);

    let topic = topic.to_owned();
    tokio::spawn(async move {
        restart_on_failure("Pose listener", POSE_LISTENER_RESTART_DELAY, move || {
            let subscriber = first_subscriber.take();
            let zenoh_session = zenoh_session.clone();
            let topic = topic.clone();
            let tracker = tracker.clone();
            async move {
                let mut subscriber = match subscriber {
                    Some(subscriber) => subscriber,
                    None => declare_pose_subscriber(&zenoh_session, &topic).await?,
                };
                run_pose_listener(&mut subscriber, &tracker).await
            }
        })
        .await
    });
    Ok(())
}

async fn declare_pose_subscriber(
    zenoh_session: &Arc<Session>,
    topic: &str,
) -> Result<FlumeSubscriber<'static>> {
    let subscriber = zenoh_session
        .declare_subscriber(topic.to_owned())
        .res()
        .await
        .map_err(ErrorWrapper::ZenohError)?;
    Ok(subscriber)
}

async fn run_pose_listener(
    subscriber: &mut FlumeSubscriber<'_>,
    tracker: &PoseTracker,
) -> anyhow::Result<()> {
    loop {
        let sample = subscriber.recv_async().await?;
        let message: String = match sample.value.try_into() {
            Ok(message) => message,
            Err(err) => {
                warn!("Dropping non text pose sample {:?}", err);
                continue;
            }
        };
        apply_pose_payload(tracker, &message);
    }
}

/// Decode a JSON pose message into `tracker`. Malformed payloads are logged
/// and leave the tracked pose untouched.
pub fn apply_pose_payload(tracker: &PoseTracker, payload: &str) -> bool {
    match serde_json::from_str::<PoseMessage>(payload) {
        Ok(message) => {
            tracker.update(&PoseSample::from(&message));
            true
        }
        Err(err) => {
            warn!("Dropping malformed pose sample {:?}", err);
            false
        }
    }
}

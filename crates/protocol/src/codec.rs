//! Wire codec: the textual encoding of `PizzaJob` and `WorkerStatus`, and
//! the `PIZZA:` / `STATUS:` / `STATUS_REQUEST` / `COMPLETED:` message
//! envelope carried over a framed channel (`plazza-ipc`).

use crate::error::IpcError;
use crate::pizza::{PizzaJob, PizzaSize, PizzaType, WorkerStatus};

/// Prefix for a dispatched pizza.
pub const PREFIX_PIZZA: &str = "PIZZA:";
/// Prefix for a status snapshot reply.
pub const PREFIX_STATUS: &str = "STATUS:";
/// The bare status-request message (no payload, no trailing `:`).
pub const PREFIX_STATUS_REQUEST: &str = "STATUS_REQUEST";
/// Prefix for a completion notice.
pub const PREFIX_COMPLETED: &str = "COMPLETED:";

/// One decoded application-level message, tagged by its wire prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A pizza handed from the dispatcher to a kitchen.
    Pizza(PizzaJob),
    /// A kitchen's answer to `STATUS_REQUEST`.
    Status(WorkerStatus),
    /// The dispatcher asking a kitchen to report its status.
    StatusRequest,
    /// A kitchen reporting that it finished cooking a job.
    Completed(PizzaJob),
}

impl Message {
    /// Render this message as the exact bytes that go into a frame payload.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Message::Pizza(job) => format!("{PREFIX_PIZZA}{}", encode_pizza_job(job)).into_bytes(),
            Message::Status(status) => {
                format!("{PREFIX_STATUS}{}", encode_worker_status(status)).into_bytes()
            }
            Message::StatusRequest => PREFIX_STATUS_REQUEST.as_bytes().to_vec(),
            Message::Completed(job) => {
                format!("{PREFIX_COMPLETED}{}", encode_pizza_job(job)).into_bytes()
            }
        }
    }

    /// Parse a frame payload back into a tagged message.
    pub fn decode(payload: &[u8]) -> Result<Self, IpcError> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| IpcError::Malformed(format!("payload is not utf-8: {e}")))?;

        if let Some(rest) = text.strip_prefix(PREFIX_PIZZA) {
            return Ok(Message::Pizza(decode_pizza_job(rest)?));
        }
        if let Some(rest) = text.strip_prefix(PREFIX_STATUS) {
            return Ok(Message::Status(decode_worker_status(rest)?));
        }
        if text == PREFIX_STATUS_REQUEST {
            return Ok(Message::StatusRequest);
        }
        if let Some(rest) = text.strip_prefix(PREFIX_COMPLETED) {
            return Ok(Message::Completed(decode_pizza_job(rest)?));
        }

        Err(IpcError::Malformed(format!("unrecognized message prefix in {text:?}")))
    }
}

/// Encode a `PizzaJob` as `<type_int>|<size_int>|<cook_time_ms>|<0|1>`.
pub fn encode_pizza_job(job: &PizzaJob) -> String {
    format!(
        "{}|{}|{}|{}",
        job.pizza_type.bit_flag(),
        job.size.bit_flag(),
        job.cook_time_ms,
        job.cooked as u8,
    )
}

/// Decode a `PizzaJob` payload produced by `encode_pizza_job`.
pub fn decode_pizza_job(payload: &str) -> Result<PizzaJob, IpcError> {
    let mut fields = payload.split('|');
    let malformed = || IpcError::Malformed(format!("bad PizzaJob payload: {payload:?}"));

    let type_flag: u8 = fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let size_flag: u8 = fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let cook_time_ms: u64 = fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let cooked_flag: u8 = fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    if fields.next().is_some() {
        return Err(malformed());
    }

    let pizza_type = PizzaType::from_bit_flag(type_flag).ok_or_else(malformed)?;
    let size = PizzaSize::from_bit_flag(size_flag).ok_or_else(malformed)?;
    let cooked = match cooked_flag {
        0 => false,
        1 => true,
        _ => return Err(malformed()),
    };

    Ok(PizzaJob { pizza_type, size, cook_time_ms, cooked })
}

/// Encode a `WorkerStatus` as `<id>|<active>|<total>|<queued>|<capacity>|<i0,..,i8>`.
pub fn encode_worker_status(status: &WorkerStatus) -> String {
    let ingredients = status
        .ingredient_counts
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{}|{}|{}|{}|{}|{}",
        status.worker_id,
        status.active_cooks,
        status.total_cooks,
        status.queued_jobs,
        status.max_capacity,
        ingredients,
    )
}

/// Decode a `WorkerStatus` payload produced by `encode_worker_status`.
pub fn decode_worker_status(payload: &str) -> Result<WorkerStatus, IpcError> {
    let malformed = || IpcError::Malformed(format!("bad WorkerStatus payload: {payload:?}"));

    let mut fields = payload.splitn(6, '|');
    let worker_id: u64 = fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let active_cooks: u32 = fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let total_cooks: u32 = fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let queued_jobs: u32 = fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let max_capacity: u32 = fields.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let ingredients_raw = fields.next().ok_or_else(malformed)?;

    let mut ingredient_counts = [0u32; 9];
    let mut count = 0;
    for (idx, raw) in ingredients_raw.split(',').enumerate() {
        if idx >= 9 {
            return Err(malformed());
        }
        ingredient_counts[idx] = raw.parse().map_err(|_| malformed())?;
        count += 1;
    }
    if count != 9 {
        return Err(malformed());
    }

    Ok(WorkerStatus {
        worker_id,
        active_cooks,
        total_cooks,
        queued_jobs,
        max_capacity,
        ingredient_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pizza_job_round_trips() {
        let job = PizzaJob::new(PizzaType::Fantasia, PizzaSize::XXL, 1.5);
        let encoded = Message::Pizza(job).encode();
        match Message::decode(&encoded).unwrap() {
            Message::Pizza(decoded) => assert_eq!(decoded, job),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn completed_job_round_trips() {
        let job = PizzaJob::new(PizzaType::Margarita, PizzaSize::S, 1.0).into_cooked();
        let encoded = Message::Completed(job).encode();
        match Message::decode(&encoded).unwrap() {
            Message::Completed(decoded) => assert_eq!(decoded, job),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn worker_status_round_trips() {
        let status = WorkerStatus {
            worker_id: 7,
            active_cooks: 2,
            total_cooks: 4,
            queued_jobs: 1,
            max_capacity: 8,
            ingredient_counts: [5, 4, 3, 2, 1, 0, 5, 5, 5],
        };
        let encoded = Message::Status(status).encode();
        match Message::decode(&encoded).unwrap() {
            Message::Status(decoded) => assert_eq!(decoded, status),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn status_request_has_no_payload() {
        let encoded = Message::StatusRequest.encode();
        assert_eq!(encoded, PREFIX_STATUS_REQUEST.as_bytes());
        assert_eq!(Message::decode(&encoded).unwrap(), Message::StatusRequest);
    }

    #[test]
    fn worker_status_requires_exactly_nine_ingredients() {
        let bad = "1|0|1|0|2|5,5,5";
        assert!(decode_worker_status(bad).is_err());
    }

    #[test]
    fn unrecognized_prefix_is_rejected() {
        assert!(Message::decode(b"GARBAGE:xyz").is_err());
    }
}

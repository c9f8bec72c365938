//! Scenario 4: a series round-trips through 3 monotonically-timed frames,
//! each carrying `r` (vector) and `m` (scalar) arrays; a 4th insert out of
//! order is rejected.

use bluetit::datatype::{DataType, Kind};
use bluetit::error::ErrorKind;
use bluetit::numeric::Vec as NVec;
use bluetit::storage::DataStorage;

fn vector_bytes(values: &[NVec<f64, 2>]) -> std::vec::Vec<u8> {
    values
        .iter()
        .flat_map(|v| v.as_array().iter().flat_map(|x| x.to_le_bytes()))
        .collect()
}

fn scalar_bytes(values: &[f64]) -> std::vec::Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn series_round_trips_three_frames_and_rejects_out_of_order_insert() {
    let storage = DataStorage::open_in_memory().unwrap();
    let series = storage.create_series("{}").unwrap();

    let times = [0.0, 0.1, 0.2];
    let r_values = [
        [NVec::from_array([0.0, 0.0]), NVec::from_array([1.0, 1.0])],
        [NVec::from_array([0.1, 0.0]), NVec::from_array([1.1, 1.0])],
        [NVec::from_array([0.2, 0.0]), NVec::from_array([1.2, 1.0])],
    ];
    let m_values = [[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]];

    for i in 0..3 {
        let frame = storage.create_frame(series, times[i]).unwrap();
        let vector_ty = DataType::vector(Kind::F64, 2);
        let scalar_ty = DataType::scalar(Kind::F64);
        let r_array = storage.create_array(frame, "r", vector_ty).unwrap();
        let m_array = storage.create_array(frame, "m", scalar_ty).unwrap();
        storage.array_data_write(r_array, &vector_bytes(&r_values[i])).unwrap();
        storage.array_data_write(m_array, &scalar_bytes(&m_values[i])).unwrap();
    }

    let frame_ids = storage.frame_ids(series).unwrap();
    assert_eq!(frame_ids.len(), 3);
    for (i, &frame) in frame_ids.iter().enumerate() {
        assert_eq!(storage.frame_time(frame).unwrap(), times[i]);
        let r_array = storage.find_array(frame, "r").unwrap().unwrap();
        let m_array = storage.find_array(frame, "m").unwrap().unwrap();
        assert_eq!(storage.array_data_read(r_array).unwrap(), vector_bytes(&r_values[i]));
        assert_eq!(storage.array_data_read(m_array).unwrap(), scalar_bytes(&m_values[i]));
        assert_eq!(storage.array_size(r_array).unwrap(), 2);
        assert_eq!(storage.array_size(m_array).unwrap(), 2);
    }

    let err = storage.create_frame(series, 0.15).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::FrameTimeNotMonotonic { .. }));
}

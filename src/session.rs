//! The PTP/SDIO session engine.
//!
//! A [`Session`] wraps an opened [`Device`], drives the Sony
//! authentication handshake, loads the extended property and control
//! descriptor tables, and exposes typed access on top of the descriptor
//! cache. Every operation issues exactly one PTP transaction with a fresh
//! transaction id; transaction ids increase monotonically for the life of
//! the session.

use crate::backend::Device;
use crate::error::{Error, Result};
use crate::metadata::{self, ControlFormSeed, DisplayKind};
use crate::ptp::{
    handle, op, prop, rc, ControlType, FormFlag, NextPhase, ProtocolVersion, PtpEvent, Request,
    Response,
};
use crate::transport::{BufferKind, Transport, TransferBuffer};
use crate::value::{skip_value, DataType, Value};
use crate::wire::{Reader, Writer};

/// A range form: minimum, maximum and step, all of the declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeForm {
    pub min: Value,
    pub max: Value,
    pub step: Value,
}

/// An enum form. Protocol 300 devices send two ordered lists; on protocol
/// 200 the single list on the wire is mirrored into both.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumForm {
    pub set: Vec<Value>,
    pub get_set: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    None,
    Range(RangeForm),
    Enum(EnumForm),
}

/// One cached device property.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub code: u16,
    pub data_type: DataType,
    pub get_set: u8,
    pub is_enabled: u8,
    pub default_value: Value,
    pub value: Value,
    pub form: Form,
    /// Adjustable only by relative step through the control path.
    pub is_notch: bool,
}

#[derive(Debug, Clone)]
pub struct ControlEnumValue {
    pub value: Value,
    pub label: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub enum ControlForm {
    None,
    Range(RangeForm),
    Enum(Vec<ControlEnumValue>),
}

/// One cached control. Controls are write-only; they carry no current
/// state.
#[derive(Debug, Clone)]
pub struct ControlDescriptor {
    pub code: u16,
    pub data_type: DataType,
    /// None when the device reports a control this build has no metadata
    /// for.
    pub control_type: Option<ControlType>,
    pub name: &'static str,
    pub form: ControlForm,
}

/// One entry of a derived display enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct PropValueEnum {
    pub value: Value,
    pub label: Option<String>,
    pub readable: bool,
    pub writable: bool,
}

/// Everything GetObjectInfo reports.
#[derive(Debug, Clone, Default)]
pub struct ObjectInfo {
    pub storage_id: u32,
    pub object_format: u16,
    pub protection_status: u16,
    pub compressed_size: u32,
    pub thumb_format: u16,
    pub thumb_compressed_size: u32,
    pub thumb_width: u32,
    pub thumb_height: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub image_depth: u32,
    pub parent_object: u32,
    pub association_type: u16,
    pub association_desc: u32,
    pub sequence_number: u32,
    pub filename: String,
    pub capture_date: String,
    pub modification_date: String,
    pub keywords: String,
}

#[derive(Debug, Clone)]
pub struct CapturedImageInfo {
    pub filename: String,
    pub object_format: u16,
    pub size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FocusFrame {
    pub frame_type: u16,
    pub state: u16,
    pub priority: u8,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FocusFrames {
    pub x_denominator: u32,
    pub y_denominator: u32,
    pub frames: Vec<FocusFrame>,
}

#[derive(Debug, Clone, Default)]
pub struct FaceFrame {
    pub frame_type: u16,
    pub state: u16,
    pub selection_state: u16,
    pub priority: u8,
    pub x_numerator: u32,
    pub y_numerator: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FaceFrames {
    pub x_denominator: u32,
    pub y_denominator: u32,
    pub frames: Vec<FaceFrame>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackingFrame {
    pub frame_type: u16,
    pub state: u16,
    pub priority: u8,
    pub x_numerator: u32,
    pub y_numerator: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default)]
pub struct TrackingFrames {
    pub x_denominator: u32,
    pub y_denominator: u32,
    pub frames: Vec<TrackingFrame>,
}

/// Focal-frame overlays delivered alongside a live-view image on protocol
/// 300 devices.
#[derive(Debug, Clone, Default)]
pub struct LiveViewFrames {
    pub version: u16,
    pub focus: FocusFrames,
    pub face: FaceFrames,
    pub tracking: TrackingFrames,
}

pub struct Session {
    device: Device,
    session_id: u32,
    transaction_id: u32,

    pub protocol_version: u16,
    pub standard_version: u16,
    pub vendor_extension_id: u32,
    pub vendor_extension_version: u16,
    pub vendor_extension: String,
    pub manufacturer: String,
    pub model: String,
    pub device_version: String,
    pub serial_number: String,

    supported_operations: Vec<u16>,
    supported_events: Vec<u16>,
    supported_properties: Vec<u16>,
    supported_controls: Vec<u16>,
    capture_formats: Vec<u16>,
    image_formats: Vec<u16>,

    properties: Vec<PropertyDescriptor>,
    controls: Vec<ControlDescriptor>,

    data_in: TransferBuffer,
    data_out: TransferBuffer,
    response: Response,
}

impl Session {
    pub fn new(device: Device) -> Self {
        let data_in = TransferBuffer::new(device.transport.prefix_len(BufferKind::DataIn));
        let data_out = TransferBuffer::new(device.transport.prefix_len(BufferKind::DataOut));
        Self {
            device,
            session_id: 0,
            transaction_id: 0,
            protocol_version: 0,
            standard_version: 0,
            vendor_extension_id: 0,
            vendor_extension_version: 0,
            vendor_extension: String::new(),
            manufacturer: String::new(),
            model: String::new(),
            device_version: String::new(),
            serial_number: String::new(),
            supported_operations: Vec::new(),
            supported_events: Vec::new(),
            supported_properties: Vec::new(),
            supported_controls: Vec::new(),
            capture_formats: Vec::new(),
            image_formats: Vec::new(),
            properties: Vec::new(),
            controls: Vec::new(),
            data_in,
            data_out,
            response: Response::default(),
        }
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn controls(&self) -> &[ControlDescriptor] {
        &self.controls
    }

    pub fn supported_operations(&self) -> &[u16] {
        &self.supported_operations
    }

    pub fn supported_events(&self) -> &[u16] {
        &self.supported_events
    }

    pub fn supported_properties(&self) -> &[u16] {
        &self.supported_properties
    }

    pub fn supported_controls(&self) -> &[u16] {
        &self.supported_controls
    }

    pub fn capture_formats(&self) -> &[u16] {
        &self.capture_formats
    }

    pub fn image_formats(&self) -> &[u16] {
        &self.image_formats
    }

    pub fn supports_operation(&self, code: u16) -> bool {
        self.supported_operations.contains(&code)
    }

    pub fn supports_event(&self, code: u16) -> bool {
        self.supported_events.contains(&code)
    }

    pub fn supports_property(&self, code: u16) -> bool {
        self.supported_properties.contains(&code)
    }

    pub fn supports_control(&self, code: u16) -> bool {
        self.supported_controls.contains(&code)
    }

    pub fn property_enabled(&self, code: u16) -> bool {
        self.get_property(code).map(|p| p.is_enabled == 1).unwrap_or(false)
    }

    /// Drain one pending device event.
    pub fn read_event(&mut self) -> Result<Option<PtpEvent>> {
        self.device.read_event()
    }

    //////////////////////////////////////////////////////////////////////
    // Request plumbing
    //////////////////////////////////////////////////////////////////////

    fn prepare_buffers(&mut self, data_in: usize, data_out: usize) -> Result<()> {
        self.data_in.resize_payload(data_in)?;
        self.data_out.resize_payload(data_out)?;
        Ok(())
    }

    fn build_request(&mut self, op_code: u16, next_phase: NextPhase, params: &[u32]) -> Request {
        let mut request = Request::new(op_code, self.session_id, self.transaction_id);
        self.transaction_id += 1;
        request.next_phase = next_phase;
        request.set_params(params);
        request
    }

    /// Run one transaction. Non-OK response codes surface as
    /// [`Error::DeviceResponse`]; a closed connection latches the device
    /// disconnected so later calls fail without touching the transport.
    fn send(&mut self, request: &Request) -> Result<usize> {
        if self.device.disconnected {
            return Err(Error::ConnectionClosed);
        }
        log::trace!(
            "{} tid={}",
            metadata::operation_name(request.op_code).unwrap_or("Operation"),
            request.transaction_id
        );
        let mut response = Response::default();
        let result = self.device.transport.send_and_recv(
            request,
            &mut self.data_in,
            &mut response,
            &mut self.data_out,
        );
        match result {
            Ok(actual) => {
                self.response = response;
                if self.response.response_code == rc::OK {
                    Ok(actual)
                } else {
                    Err(Error::DeviceResponse(self.response.response_code))
                }
            }
            Err(Error::ConnectionClosed) => {
                self.device.mark_disconnected();
                Err(Error::ConnectionClosed)
            }
            Err(e) => Err(e),
        }
    }

    /// Command with no outbound data phase; returns the data-out byte
    /// count, clamped to the buffer.
    fn do_request(&mut self, op_code: u16, data_out: usize, params: &[u32]) -> Result<usize> {
        self.prepare_buffers(0, data_out)?;
        let request = self.build_request(op_code, NextPhase::ReadData, params);
        let actual = self.send(&request)?;
        Ok(actual.min(data_out))
    }

    /// Command carrying `payload` to the device.
    fn do_request_write(
        &mut self,
        op_code: u16,
        data_out: usize,
        params: &[u32],
        payload: &[u8],
    ) -> Result<usize> {
        self.prepare_buffers(payload.len(), data_out)?;
        self.data_in.payload_mut().copy_from_slice(payload);
        let request = self.build_request(op_code, NextPhase::WriteData, params);
        let actual = self.send(&request)?;
        Ok(actual.min(data_out))
    }

    //////////////////////////////////////////////////////////////////////
    // Connect / cleanup
    //////////////////////////////////////////////////////////////////////

    /// Open the PTP session (where the transport needs it), run the SDIO
    /// authentication handshake, and load device info and the descriptor
    /// cache. On failure the session stays unusable but the transport is
    /// left open for a retry or teardown.
    pub fn connect(&mut self, version: ProtocolVersion) -> Result<()> {
        log::trace!("connect, requesting protocol {}", version.as_u16());

        if self.device.transport.requires_session_open_close() {
            self.session_id = 0;
            self.transaction_id = 0;
            match self.do_request(op::OPEN_SESSION, 8, &[1]) {
                Ok(_) => {}
                Err(Error::DeviceResponse(rc::SESSION_ALREADY_OPEN)) => {
                    log::debug!("session already open");
                }
                Err(e) => return Err(e),
            }
            self.session_id = 1;
        }

        let connection_id = 0;
        self.sdio_connect(1, connection_id)?;
        self.sdio_connect(2, connection_id)?;

        // The camera may not be ready to authenticate yet; this step is
        // the one place the engine retries.
        let mut authenticated = false;
        for attempt in 0..10 {
            match self.sdio_get_ext_device_info(version) {
                Ok(()) => {
                    authenticated = true;
                    break;
                }
                Err(e) => log::debug!("SDIO_GetExtDeviceInfo attempt {attempt} failed: {e}"),
            }
        }
        if !authenticated {
            log::error!("authentication handshake failed");
            return Err(Error::DeviceResponse(rc::GENERAL_ERROR));
        }

        self.sdio_connect(3, connection_id)?;

        self.get_device_info()?;
        self.sdio_get_all_ext_device_prop_info(false)?;
        self.seed_controls();

        log::info!(
            "connected to {} (protocol {})",
            self.model,
            self.protocol_version
        );
        Ok(())
    }

    /// Close the PTP session where the transport needs it and drop the
    /// descriptor cache and buffers. The transport stays open; hand the
    /// device back to its backend to tear that down.
    pub fn cleanup(&mut self) {
        log::trace!("cleanup");
        if self.device.transport.requires_session_open_close() && self.protocol_version != 0 {
            if let Err(e) = self.do_request(op::CLOSE_SESSION, 8, &[]) {
                log::debug!("CloseSession failed: {e}");
            }
            self.session_id = 0;
            self.transaction_id = 0;
        }
        self.protocol_version = 0;
        self.standard_version = 0;
        self.vendor_extension_id = 0;
        self.vendor_extension_version = 0;
        self.vendor_extension.clear();
        self.manufacturer.clear();
        self.model.clear();
        self.device_version.clear();
        self.serial_number.clear();
        self.supported_operations.clear();
        self.supported_events.clear();
        self.supported_properties.clear();
        self.supported_controls.clear();
        self.capture_formats.clear();
        self.image_formats.clear();
        self.properties.clear();
        self.controls.clear();
        self.data_in = TransferBuffer::new(self.device.transport.prefix_len(BufferKind::DataIn));
        self.data_out = TransferBuffer::new(self.device.transport.prefix_len(BufferKind::DataOut));
    }

    /// Cleanup and hand the device back for `close_device`.
    pub fn into_device(mut self) -> Device {
        self.cleanup();
        self.device
    }

    //////////////////////////////////////////////////////////////////////
    // SDIO handshake operations
    //////////////////////////////////////////////////////////////////////

    fn sdio_connect(&mut self, phase: u32, connection_id: u32) -> Result<()> {
        self.do_request(op::SDIO_CONNECT, 8, &[phase, connection_id, connection_id])?;
        Ok(())
    }

    fn sdio_get_ext_device_info(&mut self, version: ProtocolVersion) -> Result<()> {
        let actual =
            self.do_request(op::SDIO_GET_EXT_DEVICE_INFO, 0x1000, &[version.as_u16() as u32, 1])?;
        let payload = &self.data_out.payload()[..actual];
        let mut r = Reader::new(payload);

        let reported = r.u16_le()?;
        let num_properties = r.u32_le()?;
        let mut properties = Vec::with_capacity(num_properties as usize);
        for _ in 0..num_properties {
            properties.push(r.u16_le()?);
        }
        let num_controls = r.u32_le()?;
        let mut controls = Vec::with_capacity(num_controls as usize);
        for _ in 0..num_controls {
            controls.push(r.u16_le()?);
        }

        self.protocol_version = reported;
        self.supported_properties = properties;
        self.supported_controls = controls;
        Ok(())
    }

    fn get_device_info(&mut self) -> Result<()> {
        let actual = self.do_request(op::GET_DEVICE_INFO, 0x1000, &[])?;
        let payload = self.data_out.payload()[..actual].to_vec();
        let mut r = Reader::new(&payload);

        self.standard_version = r.u16_le()?;
        self.vendor_extension_id = r.u32_le()?;
        self.vendor_extension_version = r.u16_le()?;
        self.vendor_extension = r.ptp_string()?;
        let _functional_mode = r.u16_le()?;

        self.supported_operations = read_code_array(&mut r)?;
        self.supported_events = read_code_array(&mut r)?;
        let device_properties = read_code_array(&mut r)?;
        for code in device_properties {
            if !self.supported_properties.contains(&code) {
                self.supported_properties.push(code);
            }
        }
        self.capture_formats = read_code_array(&mut r)?;
        self.image_formats = read_code_array(&mut r)?;

        self.manufacturer = r.ptp_string()?;
        self.model = r.ptp_string()?;
        self.device_version = r.ptp_string()?;
        self.serial_number = r.ptp_string()?;
        Ok(())
    }

    fn sdio_get_all_ext_device_prop_info(&mut self, incremental: bool) -> Result<()> {
        let extended_params = [incremental as u32, 1];
        let params: &[u32] = if self.protocol_version >= 300 {
            &extended_params
        } else {
            &[]
        };
        let actual =
            self.do_request(op::SDIO_GET_ALL_EXT_DEVICE_PROP_INFO, 64 * 1024, params)?;
        let payload = self.data_out.payload()[..actual].to_vec();

        if !incremental {
            self.properties.clear();
            self.controls.clear();
        }

        let mut r = Reader::new(&payload);
        let count = r.u64_le()?;
        if self.protocol_version == 200 {
            self.parse_descriptors_v200(&mut r, count, incremental)?;
        } else {
            self.parse_descriptors_v300(&mut r, count, incremental)?;
        }
        Ok(())
    }

    /// Protocol 200 interleaves control descriptors (single enum list,
    /// no useful value fields) with property descriptors (single enum
    /// list, mirrored into both).
    fn parse_descriptors_v200(
        &mut self,
        r: &mut Reader,
        count: u64,
        incremental: bool,
    ) -> Result<()> {
        for _ in 0..count {
            let code = r.u16_le()?;
            if self.supported_controls.contains(&code) {
                let control = read_control_descriptor(r, code)?;
                match self.controls.iter_mut().find(|c| c.code == code) {
                    Some(existing) => *existing = control,
                    None => self.controls.push(control),
                }
            } else {
                let descriptor = read_property_descriptor(r, code, false)?;
                self.merge_property(descriptor, incremental);
            }
        }
        Ok(())
    }

    fn parse_descriptors_v300(
        &mut self,
        r: &mut Reader,
        count: u64,
        incremental: bool,
    ) -> Result<()> {
        for _ in 0..count {
            let code = r.u16_le()?;
            let descriptor = read_property_descriptor(r, code, true)?;
            self.merge_property(descriptor, incremental);
        }
        Ok(())
    }

    fn merge_property(&mut self, mut descriptor: PropertyDescriptor, incremental: bool) {
        descriptor.is_notch =
            self.protocol_version < 300 && metadata::is_notch_code(descriptor.code);
        if incremental {
            if let Some(existing) = self.properties.iter_mut().find(|p| p.code == descriptor.code)
            {
                descriptor.is_notch = existing.is_notch;
                *existing = descriptor;
                return;
            }
        }
        self.properties.push(descriptor);
    }

    /// Make sure every supported control has a cache entry, seeding the
    /// static metadata for those the device did not describe.
    fn seed_controls(&mut self) {
        for i in 0..self.supported_controls.len() {
            let code = self.supported_controls[i];
            if self.controls.iter().any(|c| c.code == code) {
                continue;
            }
            let control = match metadata::control_seed(code) {
                Some(seed) => ControlDescriptor {
                    code,
                    data_type: seed.data_type,
                    control_type: Some(seed.control_type),
                    name: seed.name,
                    form: match &seed.form {
                        ControlFormSeed::Values(labels) => ControlForm::Enum(
                            labels
                                .iter()
                                .map(|&(raw, label)| ControlEnumValue {
                                    value: value_from_raw(seed.data_type, raw as i64),
                                    label: Some(label),
                                })
                                .collect(),
                        ),
                        ControlFormSeed::Range { min, max, step } => ControlForm::Range(RangeForm {
                            min: value_from_raw(seed.data_type, *min),
                            max: value_from_raw(seed.data_type, *max),
                            step: value_from_raw(seed.data_type, *step),
                        }),
                        ControlFormSeed::None => ControlForm::None,
                    },
                },
                None => {
                    log::debug!("no metadata for supported control {code:#06x}");
                    ControlDescriptor {
                        code,
                        data_type: DataType::Undef,
                        control_type: None,
                        name: "",
                        form: ControlForm::None,
                    }
                }
            };
            self.controls.push(control);
        }
    }

    //////////////////////////////////////////////////////////////////////
    // Properties
    //////////////////////////////////////////////////////////////////////

    pub fn get_property(&self, code: u16) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.code == code)
    }

    /// Re-read changed descriptors from the device and merge them into
    /// the cache.
    pub fn update_properties(&mut self) -> Result<()> {
        self.sdio_get_all_ext_device_prop_info(true)
    }

    /// Absolute property write. The value must carry the descriptor's
    /// declared data type; notch properties reject the absolute path.
    pub fn set_property(&mut self, code: u16, value: Value) -> Result<()> {
        let descriptor = self.get_property(code).ok_or(Error::NotSupported)?;
        if descriptor.is_notch {
            log::error!("property {code:#06x} only accepts notch adjustment");
            return Err(Error::NotANotchProperty);
        }
        if value.data_type() != descriptor.data_type {
            return Err(Error::InvalidValue);
        }

        let mut w = Writer::with_capacity(value.byte_size());
        value.encode(&mut w)?;
        self.do_request_write(
            op::SDIO_SET_EXT_DEVICE_PROP_VALUE,
            0x1000,
            &[code as u32],
            w.as_slice(),
        )?;

        if let Some(descriptor) = self.properties.iter_mut().find(|p| p.code == code) {
            descriptor.value = value;
        }
        Ok(())
    }

    /// Relative adjustment of a notch property: a signed step through the
    /// control path.
    pub fn set_property_notch(&mut self, code: u16, notch: i8) -> Result<()> {
        log::trace!("set_property_notch({code:#06x}, {notch})");
        let descriptor = self.get_property(code).ok_or(Error::NotSupported)?;
        if !descriptor.is_notch {
            log::error!("property {code:#06x} is not a notch property");
            return Err(Error::NotANotchProperty);
        }
        self.sdio_control_device(code, &Value::I8(notch))
    }

    pub fn get_property_as_string(&self, code: u16) -> Option<String> {
        let descriptor = self.get_property(code)?;
        format_value(code, descriptor.data_type, &descriptor.value)
    }

    /// Derive the display enumeration for an enum-form property,
    /// classifying each entry as readable and/or writable from the two
    /// descriptor lists.
    pub fn get_enums_for_property(&self, code: u16) -> Option<Vec<PropValueEnum>> {
        let descriptor = self.get_property(code)?;
        let Form::Enum(form) = &descriptor.form else {
            return None;
        };

        let mut out = Vec::with_capacity(form.set.len() + form.get_set.len());
        for value in &form.set {
            out.push(PropValueEnum {
                value: value.clone(),
                label: format_value(code, descriptor.data_type, value),
                readable: true,
                writable: form.get_set.contains(value),
            });
        }
        for value in &form.get_set {
            if form.set.contains(value) {
                continue;
            }
            out.push(PropValueEnum {
                value: value.clone(),
                label: format_value(code, descriptor.data_type, value),
                readable: true,
                writable: true,
            });
        }
        Some(out)
    }

    /// Pending-capture count from property 0xD215; the top bit only hints
    /// that more files are coming.
    pub fn pending_files(&self) -> u16 {
        match self.get_property(prop::PENDING_FILES) {
            Some(PropertyDescriptor {
                value: Value::U16(v),
                ..
            }) => *v & 0x7FFF,
            _ => 0,
        }
    }

    //////////////////////////////////////////////////////////////////////
    // Controls
    //////////////////////////////////////////////////////////////////////

    pub fn get_control(&self, code: u16) -> Option<&ControlDescriptor> {
        self.controls.iter().find(|c| c.code == code)
    }

    /// Fire a control with an absolute or relative value, per its type.
    pub fn set_control(&mut self, code: u16, value: Value) -> Result<()> {
        let control = self.get_control(code).ok_or(Error::NotSupported)?;
        if control.data_type != DataType::Undef && value.data_type() != control.data_type {
            return Err(Error::InvalidValue);
        }
        self.sdio_control_device(code, &value)
    }

    /// Press (2) or release (1) a button control.
    pub fn set_control_toggle(&mut self, code: u16, pressed: bool) -> Result<()> {
        self.get_control(code).ok_or(Error::NotSupported)?;
        self.sdio_control_device(code, &Value::U16(if pressed { 2 } else { 1 }))
    }

    pub fn get_enums_for_control(&self, code: u16) -> Option<Vec<PropValueEnum>> {
        let control = self.get_control(code)?;
        let ControlForm::Enum(values) = &control.form else {
            return None;
        };
        Some(
            values
                .iter()
                .map(|entry| PropValueEnum {
                    value: entry.value.clone(),
                    label: entry.label.map(str::to_string),
                    readable: false,
                    writable: true,
                })
                .collect(),
        )
    }

    fn sdio_control_device(&mut self, code: u16, value: &Value) -> Result<()> {
        let mut w = Writer::with_capacity(value.byte_size());
        value.encode(&mut w)?;
        self.do_request_write(op::SDIO_CONTROL_DEVICE, 0x1000, &[code as u32], w.as_slice())?;
        Ok(())
    }

    //////////////////////////////////////////////////////////////////////
    // Object transfer
    //////////////////////////////////////////////////////////////////////

    pub fn get_object_info(&mut self, object_handle: u32) -> Result<ObjectInfo> {
        let actual = self.do_request(op::GET_OBJECT_INFO, 0x1000, &[object_handle])?;
        let payload = &self.data_out.payload()[..actual];
        let mut r = Reader::new(payload);
        Ok(ObjectInfo {
            storage_id: r.u32_le()?,
            object_format: r.u16_le()?,
            protection_status: r.u16_le()?,
            compressed_size: r.u32_le()?,
            thumb_format: r.u16_le()?,
            thumb_compressed_size: r.u32_le()?,
            thumb_width: r.u32_le()?,
            thumb_height: r.u32_le()?,
            image_width: r.u32_le()?,
            image_height: r.u32_le()?,
            image_depth: r.u32_le()?,
            parent_object: r.u32_le()?,
            association_type: r.u16_le()?,
            association_desc: r.u32_le()?,
            sequence_number: r.u32_le()?,
            filename: r.ptp_string()?,
            capture_date: r.ptp_string()?,
            modification_date: r.ptp_string()?,
            keywords: r.ptp_string()?,
        })
    }

    /// Download one object into `out`, with the data-out buffer sized to
    /// the expected object size.
    pub fn get_object(&mut self, object_handle: u32, size: usize, out: &mut Vec<u8>) -> Result<()> {
        let actual = self.do_request(op::GET_OBJECT, size, &[object_handle])?;
        out.clear();
        out.extend_from_slice(&self.data_out.payload()[..actual]);
        Ok(())
    }

    pub fn send_object(&mut self, object_handle: u32, data: &[u8]) -> Result<()> {
        self.do_request_write(op::SEND_OBJECT, 0x1000, &[object_handle], data)?;
        Ok(())
    }

    /// Download the most recent capture. The filename, format and size
    /// come from GetObjectInfo on the fixed captured-image handle.
    pub fn get_captured_image(&mut self, out: &mut Vec<u8>) -> Result<CapturedImageInfo> {
        log::trace!("get_captured_image");
        let info = self.get_object_info(handle::CAPTURED_IMAGE)?;
        log::debug!(
            "downloading {} ({}, {} bytes)",
            info.filename,
            metadata::object_format_name(info.object_format).unwrap_or("unknown format"),
            info.compressed_size
        );
        self.get_object(handle::CAPTURED_IMAGE, info.compressed_size as usize, out)?;
        Ok(CapturedImageInfo {
            filename: info.filename,
            object_format: info.object_format,
            size: info.compressed_size as usize,
        })
    }

    /// Fetch one live-view JPEG into `out`. On protocol 300 the reply
    /// also carries focal-frame overlays, parsed from their own offset.
    pub fn get_live_view_image(&mut self, out: &mut Vec<u8>) -> Result<LiveViewFrames> {
        log::trace!("get_live_view_image");
        let info = self.get_object_info(handle::LIVE_VIEW_IMAGE)?;
        let size = info.compressed_size as usize + 0x100;
        let actual = self.do_request(op::GET_OBJECT, size, &[handle::LIVE_VIEW_IMAGE])?;
        let payload = &self.data_out.payload()[..actual];
        parse_live_view(payload, self.protocol_version, out)
    }

    pub fn get_camera_settings_file(&mut self, out: &mut Vec<u8>) -> Result<()> {
        log::trace!("get_camera_settings_file");
        let info = self.get_object_info(handle::CAMERA_SETTINGS)?;
        self.get_object(handle::CAMERA_SETTINGS, info.compressed_size as usize, out)
    }

    pub fn put_camera_settings_file(&mut self, data: &[u8]) -> Result<()> {
        log::trace!("put_camera_settings_file");
        self.send_object(handle::CAMERA_SETTINGS, data)
    }
}

fn read_code_array(r: &mut Reader) -> Result<Vec<u16>> {
    let count = r.u32_le()? as usize;
    let mut out = Vec::with_capacity(count.min(0x1000));
    for _ in 0..count {
        out.push(r.u16_le()?);
    }
    Ok(out)
}

fn read_value_list(r: &mut Reader, data_type: DataType) -> Result<Vec<Value>> {
    let count = r.u16_le()? as usize;
    let mut out = Vec::with_capacity(count.min(0x1000));
    for _ in 0..count {
        out.push(Value::decode(r, data_type)?);
    }
    Ok(out)
}

fn read_property_descriptor(r: &mut Reader, code: u16, two_lists: bool) -> Result<PropertyDescriptor> {
    let data_type = DataType::from_code(r.u16_le()?);
    let get_set = r.u8()?;
    let is_enabled = r.u8()?;
    let default_value = Value::decode(r, data_type)?;
    let value = Value::decode(r, data_type)?;
    let form_flag = r.u8()?;

    let form = match FormFlag::from_code(form_flag) {
        Some(FormFlag::Enum) => {
            let set = read_value_list(r, data_type)?;
            let get_set_list = if two_lists {
                read_value_list(r, data_type)?
            } else {
                set.clone()
            };
            Form::Enum(EnumForm {
                set,
                get_set: get_set_list,
            })
        }
        Some(FormFlag::Range) => Form::Range(RangeForm {
            min: Value::decode(r, data_type)?,
            max: Value::decode(r, data_type)?,
            step: Value::decode(r, data_type)?,
        }),
        Some(FormFlag::None) => Form::None,
        None => return Err(Error::MalformedResponse),
    };

    Ok(PropertyDescriptor {
        code,
        data_type,
        get_set,
        is_enabled,
        default_value,
        value,
        form,
        is_notch: false,
    })
}

/// Control descriptors share the property layout on the wire, but the
/// default/current fields carry nothing useful and the enum form has a
/// single list.
fn read_control_descriptor(r: &mut Reader, code: u16) -> Result<ControlDescriptor> {
    let data_type = DataType::from_code(r.u16_le()?);
    let _get_set = r.u8()?;
    let _is_enabled = r.u8()?;
    skip_value(r, data_type)?;
    skip_value(r, data_type)?;
    let form_flag = r.u8()?;

    let form = match FormFlag::from_code(form_flag) {
        Some(FormFlag::Enum) => {
            let values = read_value_list(r, data_type)?;
            ControlForm::Enum(
                values
                    .into_iter()
                    .map(|value| ControlEnumValue { value, label: None })
                    .collect(),
            )
        }
        Some(FormFlag::Range) => ControlForm::Range(RangeForm {
            min: Value::decode(r, data_type)?,
            max: Value::decode(r, data_type)?,
            step: Value::decode(r, data_type)?,
        }),
        Some(FormFlag::None) => ControlForm::None,
        None => return Err(Error::MalformedResponse),
    };

    let seed = metadata::control_seed(code);
    Ok(ControlDescriptor {
        code,
        data_type,
        control_type: seed.map(|s| s.control_type),
        name: seed.map(|s| s.name).unwrap_or(""),
        form,
    })
}

fn value_from_raw(data_type: DataType, raw: i64) -> Value {
    match data_type {
        DataType::I8 => Value::I8(raw as i8),
        DataType::U8 => Value::U8(raw as u8),
        DataType::I16 => Value::I16(raw as i16),
        DataType::U16 => Value::U16(raw as u16),
        DataType::I32 => Value::I32(raw as i32),
        DataType::U32 => Value::U32(raw as u32),
        DataType::I64 => Value::I64(raw),
        DataType::U64 => Value::U64(raw as u64),
        _ => Value::Undef,
    }
}

fn format_value(code: u16, data_type: DataType, value: &Value) -> Option<String> {
    match metadata::display_for(code, data_type)?.kind {
        DisplayKind::Labels(labels) => {
            metadata::label_for(labels, value.as_raw_u32()?).map(str::to_string)
        }
        DisplayKind::Format(format) => format(value),
    }
}

/// Split a live-view reply into the JPEG bytes and the focal-frame
/// overlay structure.
fn parse_live_view(payload: &[u8], protocol_version: u16, out: &mut Vec<u8>) -> Result<LiveViewFrames> {
    let mut r = Reader::new(payload);
    let image_offset = r.u32_le()? as usize;
    let image_size = r.u32_le()? as usize;

    let mut frames = LiveViewFrames::default();
    if protocol_version >= 300 {
        let frame_offset = r.u32_le()? as usize;
        let frame_size = r.u32_le()? as usize;
        if frame_size > 0 {
            r.seek(frame_offset)?;
            frames.version = r.u16_le()?;
            r.skip(6 + 40)?;

            let reserved = r.u16_le()? as usize;
            r.skip(6)?;
            if reserved > 0 {
                r.skip(reserved * 24)?;
            }

            frames.focus.x_denominator = r.u32_le()?;
            frames.focus.y_denominator = r.u32_le()?;
            let count = r.u16_le()? as usize;
            r.skip(6)?;
            for _ in 0..count {
                let frame_type = r.u16_le()?;
                let state = r.u16_le()?;
                let priority = r.u8()?;
                r.skip(3)?;
                let width = r.u32_le()?;
                let height = r.u32_le()?;
                frames.focus.frames.push(FocusFrame {
                    frame_type,
                    state,
                    priority,
                    width,
                    height,
                });
            }

            if frames.version > 101 {
                frames.face.x_denominator = r.u32_le()?;
                frames.face.y_denominator = r.u32_le()?;
                let count = r.u16_le()? as usize;
                r.skip(6)?;
                for _ in 0..count {
                    let frame_type = r.u16_le()?;
                    let state = r.u16_le()?;
                    let selection_state = r.u16_le()?;
                    let priority = r.u8()?;
                    r.skip(1)?;
                    let x_numerator = r.u32_le()?;
                    let y_numerator = r.u32_le()?;
                    let width = r.u32_le()?;
                    let height = r.u32_le()?;
                    frames.face.frames.push(FaceFrame {
                        frame_type,
                        state,
                        selection_state,
                        priority,
                        x_numerator,
                        y_numerator,
                        width,
                        height,
                    });
                }

                frames.tracking.x_denominator = r.u32_le()?;
                frames.tracking.y_denominator = r.u32_le()?;
                let count = r.u16_le()? as usize;
                r.skip(6)?;
                for _ in 0..count {
                    let frame_type = r.u16_le()?;
                    let state = r.u16_le()?;
                    let priority = r.u8()?;
                    r.skip(3)?;
                    let x_numerator = r.u32_le()?;
                    let y_numerator = r.u32_le()?;
                    let width = r.u32_le()?;
                    let height = r.u32_le()?;
                    frames.tracking.frames.push(TrackingFrame {
                        frame_type,
                        state,
                        priority,
                        x_numerator,
                        y_numerator,
                        width,
                        height,
                    });
                }
            }
        }
    }

    let end = image_offset
        .checked_add(image_size)
        .filter(|&end| end <= payload.len())
        .ok_or(Error::MalformedResponse)?;
    out.clear();
    out.extend_from_slice(&payload[image_offset..end]);
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendKind, DeviceInfo, DeviceKey};
    use crate::ptp::format;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    struct Reply {
        code: u16,
        data: Vec<u8>,
    }

    fn ok() -> Result<Reply> {
        Ok(Reply {
            code: rc::OK,
            data: Vec::new(),
        })
    }

    fn ok_data(data: Vec<u8>) -> Result<Reply> {
        Ok(Reply {
            code: rc::OK,
            data,
        })
    }

    type Sent = Rc<RefCell<Vec<(Request, Vec<u8>)>>>;

    struct ScriptedTransport {
        requires_open_close: bool,
        replies: Rc<RefCell<VecDeque<Result<Reply>>>>,
        sent: Sent,
    }

    impl Transport for ScriptedTransport {
        fn prefix_len(&self, _kind: BufferKind) -> usize {
            0
        }

        fn send_and_recv(
            &mut self,
            request: &Request,
            data_in: &mut TransferBuffer,
            response: &mut Response,
            data_out: &mut TransferBuffer,
        ) -> Result<usize> {
            self.sent
                .borrow_mut()
                .push((request.clone(), data_in.payload().to_vec()));
            let reply = self
                .replies
                .borrow_mut()
                .pop_front()
                .expect("request beyond script")?;
            response.response_code = reply.code;
            response.session_id = request.session_id;
            response.transaction_id = request.transaction_id;
            let n = reply.data.len().min(data_out.payload_len());
            data_out.payload_mut()[..n].copy_from_slice(&reply.data[..n]);
            Ok(reply.data.len())
        }

        fn requires_session_open_close(&self) -> bool {
            self.requires_open_close
        }
    }

    struct Script {
        sent: Sent,
        replies: Rc<RefCell<VecDeque<Result<Reply>>>>,
    }

    impl Script {
        fn push(&self, reply: Result<Reply>) {
            self.replies.borrow_mut().push_back(reply);
        }

        fn sent(&self) -> Vec<(Request, Vec<u8>)> {
            self.sent.borrow().clone()
        }

        fn last_sent(&self) -> (Request, Vec<u8>) {
            self.sent.borrow().last().cloned().expect("nothing sent")
        }
    }

    fn new_session(requires_open_close: bool) -> (Session, Script) {
        let sent: Sent = Rc::default();
        let replies: Rc<RefCell<VecDeque<Result<Reply>>>> = Rc::default();
        let transport = ScriptedTransport {
            requires_open_close,
            replies: replies.clone(),
            sent: sent.clone(),
        };
        let info = DeviceInfo {
            backend: BackendKind::Usb,
            manufacturer: "Sony".into(),
            product: "ILCE-7M4".into(),
            serial: String::new(),
            usb_vendor_id: Some(0x054C),
            usb_product_id: None,
            usb_version: None,
            host: None,
            key: DeviceKey::Usb(0),
        };
        let session = Session::new(Device::new(info, Box::new(transport)));
        (session, Script { sent, replies })
    }

    fn ext_device_info(version: u16, properties: &[u16], controls: &[u16]) -> Vec<u8> {
        let mut w = Writer::new();
        w.u16_le(version);
        w.u32_le(properties.len() as u32);
        for &code in properties {
            w.u16_le(code);
        }
        w.u32_le(controls.len() as u32);
        for &code in controls {
            w.u16_le(code);
        }
        w.into_vec()
    }

    fn device_info(model: &str) -> Vec<u8> {
        let mut w = Writer::new();
        w.u16_le(100);
        w.u32_le(0x11);
        w.u16_le(300);
        w.ptp_string("Sony PTP Extensions").unwrap();
        w.u16_le(0); // functional mode
        for codes in [
            &[op::GET_OBJECT, op::SEND_OBJECT][..],
            &[crate::ptp::event::SDIO_OBJECT_ADDED][..],
            &[][..],
            &[format::RAW][..],
            &[format::JPEG][..],
        ] {
            w.u32_le(codes.len() as u32);
            for &code in codes {
                w.u16_le(code);
            }
        }
        w.ptp_string("Sony Corporation").unwrap();
        w.ptp_string(model).unwrap();
        w.ptp_string("1.00").unwrap();
        w.ptp_string("0000001").unwrap();
        w.into_vec()
    }

    fn prop_u16_enum(
        w: &mut Writer,
        code: u16,
        default: u16,
        current: u16,
        set: &[u16],
        get_set: Option<&[u16]>,
    ) {
        w.u16_le(code);
        w.u16_le(DataType::U16.code());
        w.u8(1);
        w.u8(1);
        w.u16_le(default);
        w.u16_le(current);
        w.u8(0x02);
        w.u16_le(set.len() as u16);
        for &v in set {
            w.u16_le(v);
        }
        if let Some(get_set) = get_set {
            w.u16_le(get_set.len() as u16);
            for &v in get_set {
                w.u16_le(v);
            }
        }
    }

    fn prop_u32_enum(
        w: &mut Writer,
        code: u16,
        default: u32,
        current: u32,
        set: &[u32],
        get_set: Option<&[u32]>,
    ) {
        w.u16_le(code);
        w.u16_le(DataType::U32.code());
        w.u8(1);
        w.u8(1);
        w.u32_le(default);
        w.u32_le(current);
        w.u8(0x02);
        w.u16_le(set.len() as u16);
        for &v in set {
            w.u32_le(v);
        }
        if let Some(get_set) = get_set {
            w.u16_le(get_set.len() as u16);
            for &v in get_set {
                w.u32_le(v);
            }
        }
    }

    fn all_prop_info(count: u64, body: impl FnOnce(&mut Writer)) -> Vec<u8> {
        let mut w = Writer::new();
        w.u64_le(count);
        body(&mut w);
        w.into_vec()
    }

    /// Queue the full connect exchange and run it.
    fn connect(
        session: &mut Session,
        script: &Script,
        version: ProtocolVersion,
        ext_info: Vec<u8>,
        prop_info: Vec<u8>,
    ) {
        if session.device.transport.requires_session_open_close() {
            script.push(ok()); // OpenSession
        }
        script.push(ok()); // SDIO_Connect phase 1
        script.push(ok()); // SDIO_Connect phase 2
        script.push(ok_data(ext_info));
        script.push(ok()); // SDIO_Connect phase 3
        script.push(ok_data(device_info("ILCE-7M4")));
        script.push(ok_data(prop_info));
        session.connect(version).unwrap();
    }

    fn object_info(filename: &str, object_format: u16, size: u32) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32_le(0x0001_0001);
        w.u16_le(object_format);
        w.u16_le(0);
        w.u32_le(size);
        w.u16_le(format::JPEG);
        w.u32_le(0);
        w.u32_le(0);
        w.u32_le(0);
        w.u32_le(7008);
        w.u32_le(4672);
        w.u32_le(24);
        w.u32_le(0);
        w.u16_le(0);
        w.u32_le(0);
        w.u32_le(1);
        w.ptp_string(filename).unwrap();
        w.ptp_string("20260801T120000").unwrap();
        w.ptp_string("20260801T120000").unwrap();
        w.ptp_string("").unwrap();
        w.into_vec()
    }

    #[test]
    fn transaction_ids_are_monotonic() {
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(1, |w| {
            prop_u32_enum(w, prop::SHUTTER_SPEED, 0, 0x000A0001, &[0x000A0001], Some(&[0x000A0001]))
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[prop::SHUTTER_SPEED], &[]),
            prop_info.clone(),
        );

        script.push(ok_data(prop_info.clone()));
        session.update_properties().unwrap();
        script.push(ok_data(prop_info));
        session.update_properties().unwrap();

        let sent = script.sent();
        assert_eq!(sent[0].0.op_code, op::OPEN_SESSION);
        assert_eq!(sent[0].0.transaction_id, 0);
        for (i, (request, _)) in sent.iter().enumerate() {
            assert_eq!(request.transaction_id, i as u32);
        }
    }

    #[test]
    fn s1_connect_and_read_shutter_speed() {
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(1, |w| {
            prop_u32_enum(w, prop::SHUTTER_SPEED, 0, 0x000A0001, &[0x000A0001], Some(&[0x000A0001]))
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[prop::SHUTTER_SPEED], &[]),
            prop_info,
        );

        assert_eq!(session.protocol_version, 300);
        assert_eq!(session.model, "ILCE-7M4");
        assert_eq!(session.manufacturer, "Sony Corporation");
        assert!(session.supports_property(prop::SHUTTER_SPEED));
        assert!(session.supports_operation(op::GET_OBJECT));
        assert_eq!(session.capture_formats(), &[format::RAW]);
        assert_eq!(
            session.get_property_as_string(prop::SHUTTER_SPEED).unwrap(),
            "10/1"
        );
    }

    #[test]
    fn s2_set_white_balance_to_daylight() {
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(1, |w| {
            prop_u16_enum(w, 0xD005, 2, 2, &[0x0002, 0x0004], Some(&[0x0002, 0x0004]))
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[0xD005], &[]),
            prop_info,
        );

        script.push(ok());
        session.set_property(0xD005, Value::U16(0x0004)).unwrap();

        let (request, payload) = script.last_sent();
        assert_eq!(request.op_code, op::SDIO_SET_EXT_DEVICE_PROP_VALUE);
        assert_eq!(request.params(), &[0xD005]);
        assert_eq!(request.next_phase, NextPhase::WriteData);
        assert_eq!(payload, vec![0x04, 0x00]);
        assert_eq!(
            session.get_property(0xD005).unwrap().value,
            Value::U16(0x0004)
        );
    }

    #[test]
    fn s3_notch_property_paths_are_exclusive() {
        // Protocol 200: f-number adjusts only through the control path.
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(1, |w| {
            prop_u16_enum(w, prop::F_NUMBER, 400, 400, &[280, 400, 800], None)
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V200,
            ext_device_info(200, &[prop::F_NUMBER], &[]),
            prop_info,
        );

        // The v200 descriptor request carries no parameters.
        let all_prop_request = script
            .sent()
            .into_iter()
            .find(|(r, _)| r.op_code == op::SDIO_GET_ALL_EXT_DEVICE_PROP_INFO)
            .unwrap();
        assert_eq!(all_prop_request.0.num_params, 0);

        assert!(matches!(
            session.set_property(prop::F_NUMBER, Value::U16(800)),
            Err(Error::NotANotchProperty)
        ));

        script.push(ok());
        session.set_property_notch(prop::F_NUMBER, 1).unwrap();
        let (request, payload) = script.last_sent();
        assert_eq!(request.op_code, op::SDIO_CONTROL_DEVICE);
        assert_eq!(request.params(), &[prop::F_NUMBER as u32]);
        assert_eq!(payload, vec![0x01]);

        // And the reverse: notch stepping a regular property is refused.
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(1, |w| {
            prop_u16_enum(w, 0xD005, 2, 2, &[2, 4], Some(&[2, 4]))
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[0xD005], &[]),
            prop_info,
        );
        assert!(matches!(
            session.set_property_notch(0xD005, -1),
            Err(Error::NotANotchProperty)
        ));
    }

    #[test]
    fn set_round_trips_through_update() {
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(1, |w| {
            prop_u16_enum(w, 0xD005, 2, 2, &[2, 4], Some(&[2, 4]))
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[0xD005], &[]),
            prop_info,
        );

        script.push(ok());
        session.set_property(0xD005, Value::U16(4)).unwrap();

        script.push(ok_data(all_prop_info(1, |w| {
            prop_u16_enum(w, 0xD005, 2, 4, &[2, 4], Some(&[2, 4]))
        })));
        session.update_properties().unwrap();
        assert_eq!(session.get_property(0xD005).unwrap().value, Value::U16(4));
    }

    #[test]
    fn incremental_update_preserves_notch_flag() {
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(1, |w| {
            prop_u16_enum(w, prop::F_NUMBER, 400, 400, &[280, 400], None)
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V200,
            ext_device_info(200, &[prop::F_NUMBER], &[]),
            prop_info,
        );
        assert!(session.get_property(prop::F_NUMBER).unwrap().is_notch);

        script.push(ok_data(all_prop_info(1, |w| {
            prop_u16_enum(w, prop::F_NUMBER, 400, 560, &[280, 400, 560], None)
        })));
        session.update_properties().unwrap();
        let descriptor = session.get_property(prop::F_NUMBER).unwrap();
        assert_eq!(descriptor.value, Value::U16(560));
        assert!(descriptor.is_notch);
    }

    #[test]
    fn enum_entries_classify_readable_writable() {
        // set = [a, b], get/set = [a, c]: a and c writable, b read-only.
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(1, |w| {
            prop_u16_enum(w, 0xD005, 1, 1, &[1, 2], Some(&[1, 3]))
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[0xD005], &[]),
            prop_info,
        );

        let enums = session.get_enums_for_property(0xD005).unwrap();
        assert_eq!(enums.len(), 3);
        assert_eq!(enums[0].value, Value::U16(1));
        assert!(enums[0].readable && enums[0].writable);
        assert_eq!(enums[1].value, Value::U16(2));
        assert!(enums[1].readable && !enums[1].writable);
        assert_eq!(enums[2].value, Value::U16(3));
        assert!(enums[2].readable && enums[2].writable);
    }

    #[test]
    fn protocol_200_mirrors_single_enum_list() {
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(1, |w| {
            prop_u16_enum(w, 0xD005, 2, 2, &[2, 4], None)
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V200,
            ext_device_info(200, &[0xD005], &[]),
            prop_info,
        );

        let Form::Enum(form) = &session.get_property(0xD005).unwrap().form else {
            panic!("expected enum form");
        };
        assert_eq!(form.set, form.get_set);
        let enums = session.get_enums_for_property(0xD005).unwrap();
        assert!(enums.iter().all(|e| e.readable && e.writable));
    }

    #[test]
    fn s4_captured_image_download() {
        let (mut session, script) = new_session(true);
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[], &[]),
            all_prop_info(0, |_| {}),
        );

        let size = 24_123_456usize;
        let image: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        script.push(ok_data(object_info("DSC00001.ARW", format::RAW, size as u32)));
        script.push(ok_data(image.clone()));

        let mut out = Vec::new();
        let info = session.get_captured_image(&mut out).unwrap();
        assert_eq!(info.filename, "DSC00001.ARW");
        assert_eq!(info.object_format, 0xB101);
        assert_eq!(info.size, size);
        assert_eq!(out.len(), size);
        assert!(out == image);

        let (request, _) = script.last_sent();
        assert_eq!(request.op_code, op::GET_OBJECT);
        assert_eq!(request.params(), &[handle::CAPTURED_IMAGE]);
    }

    #[test]
    fn live_view_image_with_focal_frames() {
        let (mut session, script) = new_session(true);
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[], &[]),
            all_prop_info(0, |_| {}),
        );

        let jpeg: Vec<u8> = (0..2048u32).map(|i| (i % 199) as u8).collect();

        // Focal-frame block: version, 46 reserved bytes, empty reserved
        // array, denominators, one focus frame.
        let mut frames = Writer::new();
        frames.u16_le(100);
        frames.bytes(&[0u8; 46]);
        frames.u16_le(0);
        frames.bytes(&[0u8; 6]);
        frames.u32_le(10000);
        frames.u32_le(10000);
        frames.u16_le(1);
        frames.bytes(&[0u8; 6]);
        frames.u16_le(0x0003); // wide
        frames.u16_le(0x0002); // focused
        frames.u8(1);
        frames.bytes(&[0u8; 3]);
        frames.u32_le(1200);
        frames.u32_le(800);
        let frames = frames.into_vec();

        let frame_offset = 16usize;
        let image_offset = frame_offset + frames.len();
        let mut reply = Writer::new();
        reply.u32_le(image_offset as u32);
        reply.u32_le(jpeg.len() as u32);
        reply.u32_le(frame_offset as u32);
        reply.u32_le(frames.len() as u32);
        reply.bytes(&frames);
        reply.bytes(&jpeg);

        script.push(ok_data(object_info("liveview.jpg", format::JPEG, jpeg.len() as u32)));
        script.push(ok_data(reply.into_vec()));

        let mut out = Vec::new();
        let frames = session.get_live_view_image(&mut out).unwrap();
        assert_eq!(out, jpeg);
        assert_eq!(frames.version, 100);
        assert_eq!(frames.focus.x_denominator, 10000);
        assert_eq!(frames.focus.frames.len(), 1);
        assert_eq!(frames.focus.frames[0].width, 1200);
        assert_eq!(frames.focus.frames[0].height, 800);
        assert!(frames.face.frames.is_empty());
    }

    #[test]
    fn camera_settings_round_trip() {
        let (mut session, script) = new_session(true);
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[], &[]),
            all_prop_info(0, |_| {}),
        );

        let blob = vec![0x53u8; 512];
        script.push(ok_data(object_info("CAMSET01.DAT", format::TEXT, blob.len() as u32)));
        script.push(ok_data(blob.clone()));
        let mut out = Vec::new();
        session.get_camera_settings_file(&mut out).unwrap();
        assert_eq!(out, blob);

        script.push(ok());
        session.put_camera_settings_file(&blob).unwrap();
        let (request, payload) = script.last_sent();
        assert_eq!(request.op_code, op::SEND_OBJECT);
        assert_eq!(request.params(), &[handle::CAMERA_SETTINGS]);
        assert_eq!(payload, blob);
    }

    #[test]
    fn pending_files_masks_high_bit() {
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(1, |w| {
            w.u16_le(prop::PENDING_FILES);
            w.u16_le(DataType::U16.code());
            w.u8(1);
            w.u8(1);
            w.u16_le(0);
            w.u16_le(0x8003);
            w.u8(0x00);
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[prop::PENDING_FILES], &[]),
            prop_info,
        );
        assert_eq!(session.pending_files(), 3);
    }

    #[test]
    fn controls_are_seeded_from_metadata() {
        let (mut session, script) = new_session(true);
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(
                300,
                &[],
                &[crate::ptp::ctrl::S1_BUTTON, crate::ptp::ctrl::MANUAL_FOCUS_ADJUST],
            ),
            all_prop_info(0, |_| {}),
        );

        let s1 = session.get_control(crate::ptp::ctrl::S1_BUTTON).unwrap();
        assert_eq!(s1.name, "Shutter Half-Press Button");
        assert_eq!(s1.control_type, Some(ControlType::Button));

        let mf = session.get_control(crate::ptp::ctrl::MANUAL_FOCUS_ADJUST).unwrap();
        assert_eq!(mf.control_type, Some(ControlType::Notch));
        assert!(matches!(mf.form, ControlForm::Range(_)));

        let enums = session
            .get_enums_for_control(crate::ptp::ctrl::S1_BUTTON)
            .unwrap();
        assert_eq!(enums.len(), 2);
        assert_eq!(enums[0].label.as_deref(), Some("Up"));
        assert!(enums.iter().all(|e| e.writable && !e.readable));

        script.push(ok());
        session
            .set_control_toggle(crate::ptp::ctrl::S1_BUTTON, true)
            .unwrap();
        let (request, payload) = script.last_sent();
        assert_eq!(request.op_code, op::SDIO_CONTROL_DEVICE);
        assert_eq!(request.params(), &[crate::ptp::ctrl::S1_BUTTON as u32]);
        assert_eq!(payload, vec![0x02, 0x00]);

        // Unknown controls are refused outright.
        assert!(matches!(
            session.set_control(0xD2FF, Value::U16(1)),
            Err(Error::NotSupported)
        ));
    }

    #[test]
    fn protocol_200_parses_interleaved_control_descriptors() {
        let (mut session, script) = new_session(true);
        let prop_info = all_prop_info(2, |w| {
            // Control descriptor for S1 (single enum list).
            w.u16_le(crate::ptp::ctrl::S1_BUTTON);
            w.u16_le(DataType::U16.code());
            w.u8(1);
            w.u8(1);
            w.u16_le(0);
            w.u16_le(0);
            w.u8(0x02);
            w.u16_le(2);
            w.u16_le(1);
            w.u16_le(2);
            // A regular property after it.
            prop_u16_enum(w, 0xD005, 2, 2, &[2, 4], None);
        });
        connect(
            &mut session,
            &script,
            ProtocolVersion::V200,
            ext_device_info(200, &[0xD005], &[crate::ptp::ctrl::S1_BUTTON]),
            prop_info,
        );

        let control = session.get_control(crate::ptp::ctrl::S1_BUTTON).unwrap();
        assert_eq!(control.name, "Shutter Half-Press Button");
        let ControlForm::Enum(values) = &control.form else {
            panic!("expected enum form");
        };
        assert_eq!(values.len(), 2);
        assert!(session.get_property(0xD005).is_some());
        assert!(session.get_property(crate::ptp::ctrl::S1_BUTTON).is_none());
    }

    #[test]
    fn connection_closed_latches_disconnected() {
        let (mut session, script) = new_session(true);
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[], &[]),
            all_prop_info(0, |_| {}),
        );

        script.push(Err(Error::ConnectionClosed));
        assert!(matches!(
            session.update_properties(),
            Err(Error::ConnectionClosed)
        ));

        // No reply queued: a further call must fail without touching the
        // transport.
        assert!(matches!(
            session.update_properties(),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn device_errors_carry_the_raw_code() {
        let (mut session, script) = new_session(true);
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[0xD005], &[]),
            all_prop_info(1, |w| prop_u16_enum(w, 0xD005, 2, 2, &[2, 4], Some(&[2, 4]))),
        );

        script.push(Ok(Reply {
            code: rc::DEVICE_BUSY,
            data: Vec::new(),
        }));
        match session.set_property(0xD005, Value::U16(4)) {
            Err(Error::DeviceResponse(code)) => assert_eq!(code, rc::DEVICE_BUSY),
            other => panic!("unexpected {other:?}"),
        }
        // A failed set leaves the cache untouched.
        assert_eq!(session.get_property(0xD005).unwrap().value, Value::U16(2));
    }

    #[test]
    fn ext_device_info_is_retried() {
        let (mut session, script) = new_session(true);
        script.push(ok()); // OpenSession
        script.push(ok());
        script.push(ok());
        // Three refusals before the camera is ready.
        for _ in 0..3 {
            script.push(Ok(Reply {
                code: rc::SDIO_AUTH_FAILED,
                data: Vec::new(),
            }));
        }
        script.push(ok_data(ext_device_info(300, &[], &[])));
        script.push(ok()); // phase 3
        script.push(ok_data(device_info("ILCE-7M4")));
        script.push(ok_data(all_prop_info(0, |_| {})));
        session.connect(ProtocolVersion::V300).unwrap();
        assert_eq!(session.protocol_version, 300);
    }

    #[test]
    fn cleanup_closes_the_session_when_the_transport_needs_it() {
        let (mut session, script) = new_session(true);
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[], &[]),
            all_prop_info(0, |_| {}),
        );

        script.push(ok());
        session.cleanup();
        let (request, _) = script.last_sent();
        assert_eq!(request.op_code, op::CLOSE_SESSION);
        assert!(session.properties().is_empty());
        assert_eq!(session.protocol_version, 0);
    }

    #[test]
    fn session_bracketing_is_skipped_when_the_service_owns_it() {
        let (mut session, script) = new_session(false);
        connect(
            &mut session,
            &script,
            ProtocolVersion::V300,
            ext_device_info(300, &[], &[]),
            all_prop_info(0, |_| {}),
        );

        let sent = script.sent();
        assert_eq!(sent[0].0.op_code, op::SDIO_CONNECT);
        assert!(sent.iter().all(|(r, _)| r.op_code != op::OPEN_SESSION));

        let before = sent.len();
        session.cleanup();
        assert_eq!(script.sent().len(), before);
    }
}

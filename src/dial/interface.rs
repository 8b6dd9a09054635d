//! The unit consumed by reweighting: a shared dial plus its applicability context.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dial::{Dial, ResponseSupervisor};
use crate::domain::DataBin;
use crate::error::Result;

#[derive(Debug)]
pub struct DialInterface {
    dial: Arc<Dial>,
    bin: Option<DataBin>,
    supervisor: Option<Arc<ResponseSupervisor>>,
    masked: AtomicBool,
}

impl DialInterface {
    pub fn new(dial: Arc<Dial>) -> Self {
        Self {
            dial,
            bin: None,
            supervisor: None,
            masked: AtomicBool::new(false),
        }
    }

    pub fn with_bin(mut self, bin: DataBin) -> Self {
        self.bin = Some(bin);
        self
    }

    pub fn with_supervisor(mut self, supervisor: Arc<ResponseSupervisor>) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn dial(&self) -> &Arc<Dial> {
        &self.dial
    }

    /// Applicability region, evaluated by the consumer.
    pub fn bin(&self) -> Option<&DataBin> {
        self.bin.as_ref()
    }

    pub fn supervisor(&self) -> Option<&Arc<ResponseSupervisor>> {
        self.supervisor.as_ref()
    }

    /// Bypass the dial: a masked interface responds with a neutral `1`.
    pub fn set_masked(&self, masked: bool) {
        self.masked.store(masked, Ordering::Release);
    }

    pub fn is_masked(&self) -> bool {
        self.masked.load(Ordering::Acquire)
    }

    pub fn eval_response(&self) -> Result<f64> {
        if self.is_masked() {
            return Ok(1.0);
        }
        let response = self.dial.evaluate()?;
        Ok(match &self.supervisor {
            Some(supervisor) => supervisor.process(response),
            None => response,
        })
    }

    /// Dial summary, applicability bin and last cached response.
    pub fn summary(&self) -> String {
        let mut out = self.dial.summary();
        if let Some(bin) = &self.bin {
            out.push_str(&format!(":b{{{}}}", bin.summary()));
        }
        if let Some(supervisor) = &self.supervisor {
            out.push_str(&format!(" {}", supervisor.summary()));
        }
        if self.is_masked() {
            out.push_str(" masked");
        }
        match self.dial.cached() {
            Some(cached) => out.push_str(&format!(" => {}", cached.response)),
            None => out.push_str(" => unset"),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::dial::{CustomResponse, ResponseClamp, ResponseFunction};
    use crate::domain::BinEdge;
    use crate::params::Parameter;

    fn parameter() -> Arc<Parameter> {
        Arc::new(Parameter::new("flux", 1, "numu", 1.0, 0.1))
    }

    #[test]
    fn masked_interface_is_neutral_and_skips_the_dial() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let function = ResponseFunction::Custom(CustomResponse::new("Twice", move |x| {
            counter.fetch_add(1, Ordering::SeqCst);
            2.0 * x
        }));
        let iface = DialInterface::new(Arc::new(Dial::new(function).with_parameter(parameter())));
        iface.set_masked(true);
        assert_eq!(iface.eval_response().unwrap(), 1.0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(iface.dial().cached().is_none());

        iface.set_masked(false);
        assert_eq!(iface.eval_response().unwrap(), 2.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn supervisor_post_processes_the_response() {
        let sup = Arc::new(ResponseSupervisor::new(ResponseClamp::new(None, Some(0.5)).unwrap()));
        let iface = DialInterface::new(Arc::new(Dial::new(ResponseFunction::Norm).with_parameter(parameter())))
            .with_supervisor(sup.clone());
        assert_eq!(iface.eval_response().unwrap(), 0.5);
        assert_eq!(sup.stats().max, Some(1.0));
        // The dial cache keeps the unsupervised response.
        assert_eq!(iface.dial().cached().unwrap().response, 1.0);
    }

    #[test]
    fn summary_reports_bin_and_last_response() {
        let bin = DataBin::new(vec![BinEdge {
            variable: "Enu".to_string(),
            min: 0.0,
            max: 1.5,
        }])
        .unwrap();
        let iface = DialInterface::new(Arc::new(Dial::new(ResponseFunction::Norm).with_parameter(parameter())))
            .with_bin(bin);
        assert_eq!(iface.summary(), "flux/#1_numu(1)/Norm:b{Enu: [0, 1.5[} => unset");
        iface.eval_response().unwrap();
        assert!(iface.summary().ends_with("=> 1"));
    }
}

/// A first-order ODE system `dy/dt = f(t, y)` over a flat state vector.
///
/// Integrators call [`derivative`](OdeSystem::derivative) repeatedly within a
/// single integration call. Implementations may keep scratch state between
/// calls (hence `&mut self`), but the derivative they write must depend only
/// on `t` and `y`.
pub trait OdeSystem {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Writes `f(t, y)` into `dydt`, which has the same length as `y`.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the derivative cannot be computed.
    fn derivative(&mut self, t: f64, y: &[f64], dydt: &mut [f64]) -> Result<(), Self::Error>;
}

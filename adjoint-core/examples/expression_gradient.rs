//! Gradient of e^sin(x·y) · cos(x·y) + x + y at x = 2, y = 1.
//!
//! Reference point:
//! https://www.wolframalpha.com/input?i=gradient+of+%28e%5Esin%28xy%29%29*cos%28xy%29+%2B+x+%2B+y+at+x%3D2%2C+y%3D1

use adjoint_core::expr;
use adjoint_core::AdjointError;

fn main() -> Result<(), AdjointError> {
    let mut values = [0.0; 26];
    values[(b'x' - b'a') as usize] = 2.0;
    values[(b'y' - b'a') as usize] = 1.0;

    let mut expression = expr::parse("x y * S E x y * C * x + y +", &values)?;
    let value = expression.evaluate()?;
    expression.differentiate()?;

    println!("f(2, 1) = {value}");
    println!("df/dx   = {}", expression.gradient('x').expect("x is bound"));
    println!("df/dy   = {}", expression.gradient('y').expect("y is bound"));
    Ok(())
}

//! Built-in names of the shader language.

/// Built-in type names.
pub const TYPES: &[&str] = &[
    "void",
    "bool",
    "int",
    "uint",
    "float",
    "double",
    "vec2",
    "vec3",
    "vec4",
    "ivec2",
    "ivec3",
    "ivec4",
    "bvec2",
    "bvec3",
    "bvec4",
    "mat2",
    "mat3",
    "mat4",
    "sampler2D",
    "samplerCube",
];

/// Qualifiers that may precede a type in a declaration.
pub const QUALIFIERS: &[&str] = &[
    "const",
    "uniform",
    "attribute",
    "varying",
    "in",
    "out",
    "inout",
    "highp",
    "mediump",
    "lowp",
    "flat",
    "smooth",
];

/// Statement keywords and literals.
pub const KEYWORDS: &[&str] = &[
    "struct",
    "if",
    "else",
    "for",
    "while",
    "do",
    "return",
    "break",
    "continue",
    "discard",
    "precision",
    "true",
    "false",
];

/// Built-in variables.
pub const VARIABLES: &[&str] = &[
    "gl_Position",
    "gl_PointSize",
    "gl_FragCoord",
    "gl_FrontFacing",
    "gl_FragColor",
    "gl_PointCoord",
];

/// A built-in function overload.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinFunction {
    /// Function name.
    pub name: &'static str,
    /// Return type.
    pub returns: &'static str,
    /// Parameter labels.
    pub params: &'static [&'static str],
    /// One-line description.
    pub documentation: &'static str,
}

impl BuiltinFunction {
    /// The signature as it would be declared.
    pub fn text(&self) -> String {
        format!("{} {}({})", self.returns, self.name, self.params.join(", "))
    }
}

macro_rules! builtin {
    ($name:literal -> $returns:literal ($($param:literal),*) $doc:literal) => {
        BuiltinFunction {
            name: $name,
            returns: $returns,
            params: &[$($param),*],
            documentation: $doc,
        }
    };
}

/// Built-in functions.
pub const FUNCTIONS: &[BuiltinFunction] = &[
    builtin!("radians" -> "genType" ("genType degrees") "Converts degrees to radians."),
    builtin!("degrees" -> "genType" ("genType radians") "Converts radians to degrees."),
    builtin!("sin" -> "genType" ("genType angle") "The standard trigonometric sine."),
    builtin!("cos" -> "genType" ("genType angle") "The standard trigonometric cosine."),
    builtin!("tan" -> "genType" ("genType angle") "The standard trigonometric tangent."),
    builtin!("atan" -> "genType" ("genType y", "genType x") "Arc tangent of y/x."),
    builtin!("atan" -> "genType" ("genType y_over_x") "Arc tangent."),
    builtin!("pow" -> "genType" ("genType x", "genType y") "Returns x raised to the y power."),
    builtin!("exp" -> "genType" ("genType x") "Returns the natural exponentiation of x."),
    builtin!("log" -> "genType" ("genType x") "Returns the natural logarithm of x."),
    builtin!("sqrt" -> "genType" ("genType x") "Returns the square root of x."),
    builtin!("inversesqrt" -> "genType" ("genType x") "Returns one over the square root of x."),
    builtin!("abs" -> "genType" ("genType x") "Returns the absolute value of x."),
    builtin!("sign" -> "genType" ("genType x") "Returns -1.0, 0.0, or 1.0 depending on the sign of x."),
    builtin!("floor" -> "genType" ("genType x") "Returns the nearest integer less than or equal to x."),
    builtin!("ceil" -> "genType" ("genType x") "Returns the nearest integer greater than or equal to x."),
    builtin!("fract" -> "genType" ("genType x") "Returns x - floor(x)."),
    builtin!("mod" -> "genType" ("genType x", "genType y") "Modulus: x - y * floor(x / y)."),
    builtin!("min" -> "genType" ("genType x", "genType y") "Returns the smaller of x and y."),
    builtin!("max" -> "genType" ("genType x", "genType y") "Returns the larger of x and y."),
    builtin!("clamp" -> "genType" ("genType x", "genType minVal", "genType maxVal") "Constrains x to lie between minVal and maxVal."),
    builtin!("mix" -> "genType" ("genType x", "genType y", "genType a") "Linear blend of x and y."),
    builtin!("step" -> "genType" ("genType edge", "genType x") "Returns 0.0 if x < edge, else 1.0."),
    builtin!("smoothstep" -> "genType" ("genType edge0", "genType edge1", "genType x") "Hermite interpolation between two edges."),
    builtin!("length" -> "float" ("genType x") "Returns the length of vector x."),
    builtin!("distance" -> "float" ("genType p0", "genType p1") "Returns the distance between p0 and p1."),
    builtin!("dot" -> "float" ("genType x", "genType y") "Returns the dot product of x and y."),
    builtin!("cross" -> "vec3" ("vec3 x", "vec3 y") "Returns the cross product of x and y."),
    builtin!("normalize" -> "genType" ("genType x") "Returns a vector in the same direction as x with length 1."),
    builtin!("reflect" -> "genType" ("genType I", "genType N") "Reflects I about the surface normal N."),
    builtin!("refract" -> "genType" ("genType I", "genType N", "float eta") "Refracts I through a surface with normal N."),
    builtin!("texture2D" -> "vec4" ("sampler2D sampler", "vec2 coord") "Samples a 2D texture."),
    builtin!("texture2D" -> "vec4" ("sampler2D sampler", "vec2 coord", "float bias") "Samples a 2D texture with a level-of-detail bias."),
    builtin!("textureCube" -> "vec4" ("samplerCube sampler", "vec3 coord") "Samples a cube map."),
];

/// Check whether `name` is a built-in type.
pub fn is_type(name: &str) -> bool {
    TYPES.contains(&name)
}

/// Check whether `name` is a declaration qualifier.
pub fn is_qualifier(name: &str) -> bool {
    QUALIFIERS.contains(&name)
}

/// Check whether `name` is reserved and never refers to a user symbol.
pub fn is_reserved(name: &str) -> bool {
    is_type(name) || is_qualifier(name) || KEYWORDS.contains(&name) || VARIABLES.contains(&name)
}

/// All overloads of a built-in function.
pub fn functions_named(name: &str) -> Vec<&'static BuiltinFunction> {
    FUNCTIONS.iter().filter(|f| f.name == name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_text() {
        let clamp = functions_named("clamp");
        assert_eq!(clamp.len(), 1);
        assert_eq!(
            clamp[0].text(),
            "genType clamp(genType x, genType minVal, genType maxVal)"
        );
    }

    #[test]
    fn test_overloads() {
        assert_eq!(functions_named("texture2D").len(), 2);
        assert!(functions_named("nope").is_empty());
    }

    #[test]
    fn test_reserved() {
        assert!(is_reserved("vec3"));
        assert!(is_reserved("uniform"));
        assert!(is_reserved("return"));
        assert!(is_reserved("gl_FragColor"));
        assert!(!is_reserved("color"));
    }
}
